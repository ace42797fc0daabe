//! Memory categories and their fixed importance weights.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Weight used for categories without an entry in the weight table.
pub const DEFAULT_TYPE_WEIGHT: f64 = 0.5;

/// Kind of fact a memory record represents.
///
/// Serialized as its snake_case name. Unknown names round-trip through
/// [`MemoryCategory::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum MemoryCategory {
    EmotionalState,
    Symptoms,
    Goals,
    Triggers,
    CopingMethods,
    SupportSystem,
    WorkStatus,
    Medication,
    DailyRoutine,
    Personality,
    Concerns,
    Experiences,
    Age,
    Location,
    Family,
    Hobby,
    Name,
    Job,
    /// Caller-defined category; weighs [`DEFAULT_TYPE_WEIGHT`].
    Other(String),
}

impl MemoryCategory {
    /// All built-in categories.
    pub const BUILTIN: [MemoryCategory; 18] = [
        MemoryCategory::EmotionalState,
        MemoryCategory::Symptoms,
        MemoryCategory::Goals,
        MemoryCategory::Triggers,
        MemoryCategory::CopingMethods,
        MemoryCategory::SupportSystem,
        MemoryCategory::WorkStatus,
        MemoryCategory::Medication,
        MemoryCategory::DailyRoutine,
        MemoryCategory::Personality,
        MemoryCategory::Concerns,
        MemoryCategory::Experiences,
        MemoryCategory::Age,
        MemoryCategory::Location,
        MemoryCategory::Family,
        MemoryCategory::Hobby,
        MemoryCategory::Name,
        MemoryCategory::Job,
    ];

    /// Parse a category name. Never fails; unknown names become `Other`.
    pub fn parse(name: &str) -> Self {
        let normalized = name.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "emotional_state" => Self::EmotionalState,
            "symptoms" => Self::Symptoms,
            "goals" => Self::Goals,
            "triggers" => Self::Triggers,
            "coping_methods" => Self::CopingMethods,
            "support_system" => Self::SupportSystem,
            "work_status" => Self::WorkStatus,
            "medication" => Self::Medication,
            "daily_routine" => Self::DailyRoutine,
            "personality" => Self::Personality,
            "concerns" => Self::Concerns,
            "experiences" => Self::Experiences,
            "age" => Self::Age,
            "location" => Self::Location,
            "family" => Self::Family,
            "hobby" => Self::Hobby,
            "name" => Self::Name,
            "job" => Self::Job,
            _ => Self::Other(normalized),
        }
    }

    /// Snake_case name used for persistence and stats keys.
    pub fn as_str(&self) -> &str {
        match self {
            Self::EmotionalState => "emotional_state",
            Self::Symptoms => "symptoms",
            Self::Goals => "goals",
            Self::Triggers => "triggers",
            Self::CopingMethods => "coping_methods",
            Self::SupportSystem => "support_system",
            Self::WorkStatus => "work_status",
            Self::Medication => "medication",
            Self::DailyRoutine => "daily_routine",
            Self::Personality => "personality",
            Self::Concerns => "concerns",
            Self::Experiences => "experiences",
            Self::Age => "age",
            Self::Location => "location",
            Self::Family => "family",
            Self::Hobby => "hobby",
            Self::Name => "name",
            Self::Job => "job",
            Self::Other(name) => name.as_str(),
        }
    }

    /// Base importance weight for the category.
    pub fn type_weight(&self) -> f64 {
        match self {
            Self::EmotionalState | Self::Concerns => 0.9,
            Self::Symptoms | Self::Triggers | Self::Medication => 0.8,
            Self::WorkStatus | Self::Goals => 0.7,
            Self::Experiences | Self::CopingMethods => 0.6,
            Self::SupportSystem => 0.5,
            Self::Personality | Self::Family => 0.4,
            Self::DailyRoutine => 0.3,
            Self::Age => 0.2,
            Self::Location => 0.1,
            Self::Hobby | Self::Name | Self::Job | Self::Other(_) => DEFAULT_TYPE_WEIGHT,
        }
    }

    /// Chronic, slow-changing facts whose decay is floored.
    pub fn is_persistent(&self) -> bool {
        matches!(
            self,
            Self::Symptoms | Self::Goals | Self::Medication | Self::Personality | Self::WorkStatus
        )
    }

    /// Categories that tend to cause symptoms or emotional states.
    pub(crate) fn is_cause(&self) -> bool {
        matches!(self, Self::Triggers | Self::WorkStatus)
    }

    /// Categories that tend to be the effect of a trigger.
    pub(crate) fn is_effect(&self) -> bool {
        matches!(self, Self::Symptoms | Self::EmotionalState | Self::Concerns)
    }
}

impl fmt::Display for MemoryCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for MemoryCategory {
    fn from(value: &str) -> Self {
        Self::parse(value)
    }
}

impl From<String> for MemoryCategory {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

impl From<MemoryCategory> for String {
    fn from(value: MemoryCategory) -> Self {
        value.as_str().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::{DEFAULT_TYPE_WEIGHT, MemoryCategory};
    use pretty_assertions::assert_eq;

    #[test]
    fn builtin_names_round_trip() {
        for category in MemoryCategory::BUILTIN {
            assert_eq!(MemoryCategory::parse(category.as_str()), category);
        }
    }

    #[test]
    fn unknown_category_uses_default_weight() {
        let category = MemoryCategory::parse("Sleep_Quality");
        assert_eq!(category, MemoryCategory::Other("sleep_quality".to_string()));
        assert_eq!(category.type_weight(), DEFAULT_TYPE_WEIGHT);
        assert!(!category.is_persistent());
    }

    #[test]
    fn serializes_as_snake_case_string() {
        let json = serde_json::to_string(&MemoryCategory::CopingMethods).expect("serialize");
        assert_eq!(json, "\"coping_methods\"");
        let parsed: MemoryCategory = serde_json::from_str("\"custom\"").expect("deserialize");
        assert_eq!(parsed, MemoryCategory::Other("custom".to_string()));
    }
}

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Meal {
    pub id: i64,
    pub username: String,
    pub title: String,
    pub carbs: f64,
    pub proteins: f64,
    pub fats: f64,
    pub total_calories: f64,
    pub created_at: String,
    #[serde(default)]
    pub deleted_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MealCreate {
    pub username: String,
    pub title: String,
    pub carbs: f64,
    pub proteins: f64,
    pub fats: f64,
    pub total_calories: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Stats {
    pub total_carbs: f64,
    pub total_proteins: f64,
    pub total_fats: f64,
    pub total_calories: f64,
    pub meal_count: u64,
}

/// Stats scoped to the server's current day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TodayStats {
    #[serde(flatten)]
    pub totals: Stats,
    pub date: String,
}

/// Body of the inference call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MealDescription {
    pub description: String,
    pub username: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InferredMeal {
    pub title: String,
    pub carbs: f64,
    pub proteins: f64,
    pub fats: f64,
    pub total_calories: f64,
}

impl InferredMeal {
    pub fn into_create(self, username: &str) -> MealCreate {
        MealCreate {
            username: username.to_owned(),
            title: self.title,
            carbs: self.carbs,
            proteins: self.proteins,
            fats: self.fats,
            total_calories: self.total_calories,
        }
    }
}

/// Which meals the list query asks for. Serialized as the raw
/// `date_filter` query value: `"today"` or `""`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DateFilter {
    #[default]
    #[serde(rename = "today")]
    Today,
    #[serde(rename = "")]
    AllTime,
}

impl DateFilter {
    pub fn as_query(self) -> &'static str {
        match self {
            DateFilter::Today => "today",
            DateFilter::AllTime => "",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            DateFilter::Today => "Today",
            DateFilter::AllTime => "All time",
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub username: String,
}

#[derive(Debug, Deserialize)]
pub struct FilterForm {
    #[serde(default)]
    pub date_filter: DateFilter,
}

/// Raw meal entry inputs. Which fields matter depends on the configured
/// entry mode; the rest stay empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MealEntryForm {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub carbs: String,
    #[serde(default)]
    pub proteins: String,
    #[serde(default)]
    pub fats: String,
    #[serde(default)]
    pub calories: String,
    #[serde(default)]
    pub description: String,
}

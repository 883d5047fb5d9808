use crate::models::TodayStats;
use chrono::NaiveDate;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Macro {
    Carbs,
    Proteins,
    Fats,
}

impl Macro {
    pub fn name(self) -> &'static str {
        match self {
            Macro::Carbs => "Carbs",
            Macro::Proteins => "Proteins",
            Macro::Fats => "Fats",
        }
    }

    pub fn color(self) -> &'static str {
        match self {
            Macro::Carbs => "#3B82F6",
            Macro::Proteins => "#10B981",
            Macro::Fats => "#F59E0B",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MacroSlice {
    pub nutrient: Macro,
    pub grams: f64,
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StatsSummary {
    pub carbs: String,
    pub proteins: String,
    pub fats: String,
    pub calories: String,
    pub meal_count: String,
    pub date: String,
    pub breakdown: Option<Vec<MacroSlice>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StatsPanel {
    Loading,
    Empty,
    Summary(StatsSummary),
}

impl StatsPanel {
    pub fn build(stats: Option<&TodayStats>) -> Self {
        let Some(stats) = stats else {
            return StatsPanel::Loading;
        };
        let totals = &stats.totals;
        if totals.total_calories <= 0.0 && totals.meal_count == 0 {
            return StatsPanel::Empty;
        }

        StatsPanel::Summary(StatsSummary {
            carbs: format!("{:.1}", totals.total_carbs),
            proteins: format!("{:.1}", totals.total_proteins),
            fats: format!("{:.1}", totals.total_fats),
            calories: format!("{:.0}", totals.total_calories),
            meal_count: meal_count_label(totals.meal_count),
            date: format_day(&stats.date),
            breakdown: macro_breakdown(totals.total_carbs, totals.total_proteins, totals.total_fats),
        })
    }
}

pub fn meal_count_label(count: u64) -> String {
    if count == 1 {
        "1 meal logged".to_string()
    } else {
        format!("{count} meals logged")
    }
}

/// Share of each macro's grams in the macro total, rounded to one decimal.
/// Zero-gram macros are left out; `None` when there is nothing to split.
pub fn macro_breakdown(carbs: f64, proteins: f64, fats: f64) -> Option<Vec<MacroSlice>> {
    let total = carbs + proteins + fats;
    if total <= 0.0 {
        return None;
    }

    let slices = [
        (Macro::Carbs, carbs),
        (Macro::Proteins, proteins),
        (Macro::Fats, fats),
    ]
    .into_iter()
    .filter(|(_, grams)| *grams > 0.0)
    .map(|(nutrient, grams)| MacroSlice {
        nutrient,
        grams,
        percentage: round_tenth(grams / total * 100.0),
    })
    .collect();
    Some(slices)
}

fn round_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn format_day(raw: &str) -> String {
    match NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        Ok(date) => date.format("%A, %B %-d, %Y").to_string(),
        Err(_) => raw.to_string(),
    }
}

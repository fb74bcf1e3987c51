//! `pantry suggest <ingredient>...`

use anyhow::{bail, Result};

use pantry_core::MealSuggestion;
use pantry_pipeline::ReceiptPipeline;

use crate::terminal_output::{note_error, note_warn, render_table, Column};

pub async fn run(pipeline: &ReceiptPipeline, ingredients: &[String]) -> Result<()> {
    let result = pipeline.suggest_meals(ingredients).await;

    if let Some(reason) = result.outcome.message() {
        note_error(reason);
        bail!("meal suggestion failed");
    }

    match &result.suggestions {
        Some(meals) => print!("{}", meal_table(meals)),
        None => {
            note_warn("Reply was not structured; showing it as returned");
            println!("{}", result.raw_response);
        }
    }
    Ok(())
}

fn meal_table(meals: &[MealSuggestion]) -> String {
    let columns = vec![
        Column::left("Meal"),
        Column::right("Time"),
        Column::left("Difficulty"),
        Column::left("Missing"),
    ];
    let rows: Vec<Vec<String>> = meals
        .iter()
        .map(|meal| {
            let missing: Vec<&str> = meal
                .ingredients
                .iter()
                .filter(|i| !i.available)
                .map(|i| i.name.as_str())
                .collect();
            vec![
                meal.name.clone(),
                meal.prep_time.clone().unwrap_or_default(),
                meal.difficulty.clone().unwrap_or_default(),
                missing.join(", "),
            ]
        })
        .collect();
    render_table(&columns, &rows)
}

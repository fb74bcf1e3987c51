//! Prompt templates sent to the language model.
//!
//! Every builder is total: any input string, including an empty one,
//! produces a complete prompt.

pub const RECEIPT_SYSTEM_PROMPT: &str =
    "You extract structured data from grocery receipts. Reply with JSON only.";

/// Instructions for turning OCR text into receipt JSON.
pub fn receipt_prompt(receipt_text: &str) -> String {
    format!(
        "Parse this receipt text and extract the following information in JSON format:\n\
         - store_name\n\
         - date (YYYY-MM-DD format)\n\
         - total_amount (numeric)\n\
         - items (array with name, quantity, unit_price, total_price)\n\
         \n\
         Receipt text:\n\
         {receipt_text}\n\
         \n\
         Return only valid JSON, no additional text."
    )
}

/// Follow-up sent when a reply failed to decode.
pub fn correction_prompt(receipt_text: &str, rejected: &str, error: &str) -> String {
    format!(
        "{}\n\n\
         Your previous answer could not be used:\n\
         {rejected}\n\n\
         Problem: {error}\n\n\
         Answer again with a single JSON object that fixes the problem. \
         Use null for fields you cannot read. Do not add any other text.",
        receipt_prompt(receipt_text)
    )
}

/// Ask for three meals built around the given ingredients.
pub fn meal_prompt(ingredients: &[String]) -> String {
    let items_text = ingredients.join(", ");
    format!(
        "Based on these available ingredients: {items_text}\n\
         \n\
         Generate 3 meal suggestions with:\n\
         - Recipe name\n\
         - Ingredients needed (mark which are available)\n\
         - Preparation time\n\
         - Difficulty level\n\
         - Brief instructions\n\
         \n\
         Return as JSON format: an array of objects with keys recipe_name, \
         ingredients (objects with name and available), preparation_time, \
         difficulty, instructions."
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_text_still_builds_a_full_prompt() {
        let prompt = receipt_prompt("");
        assert!(prompt.contains("store_name"));
        assert!(prompt.contains("Receipt text:\n\n"));
        assert!(prompt.ends_with("Return only valid JSON, no additional text."));
    }

    #[test]
    fn receipt_text_is_embedded_verbatim() {
        let text = "ALDI {weird} braces\n$4.99";
        assert!(receipt_prompt(text).contains(text));
    }

    #[test]
    fn correction_repeats_instructions_and_error() {
        let prompt = correction_prompt("Total: $12.50", "not json", "expected value at line 1");
        assert!(prompt.contains("Receipt text:\nTotal: $12.50"));
        assert!(prompt.contains("not json"));
        assert!(prompt.contains("expected value at line 1"));
    }

    #[test]
    fn meal_prompt_lists_ingredients() {
        let ingredients = vec!["eggs".to_string(), "spinach".to_string(), "feta".to_string()];
        assert!(meal_prompt(&ingredients)
            .starts_with("Based on these available ingredients: eggs, spinach, feta"));
        assert!(meal_prompt(&[]).contains("Generate 3 meal suggestions"));
    }
}

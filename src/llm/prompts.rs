//! Prompt templates for the two model calls of a request.
//!
//! Rendering is pure: a context struct goes in, prompt text comes out. No
//! I/O happens here, so prompts can be checked without a model.

use crate::db::{ResultSet, SchemaDescription};
use crate::llm::LlmError;
use crate::llm::models::{
    NARRATION_EXAMPLES, NarrationPromptContext, SQL_EXAMPLES, SqlPromptContext,
};
use minijinja::Environment;

/// Dialect named in the prompts; every query runs through DuckDB.
const DIALECT: &str = "DuckDB";

const SQL_TEMPLATE_NAME: &str = "sql_generation.txt";
const NARRATION_TEMPLATE_NAME: &str = "narration.txt";

const SQL_TEMPLATE: &str = r#"Below is the schema of a {{ dialect }} database. Read the schema carefully for the table and column names.

IMPORTANT RULES:
1. Table and column names are case sensitive. Use them exactly as written in the schema.
2. There are no underscores in the column names unless the schema explicitly shows them.
3. When asked about trends over time or yearly data, ALWAYS use GROUP BY with the year/date field.
4. For time-based queries, ALWAYS show the time field in the SELECT clause.
5. When counting by year or category, ALWAYS use COUNT(*) with GROUP BY.
6. ALWAYS give selected expressions an alias with 'as'.

{{ schema }}

Please only provide the SQL query and nothing else.

For example:
{% for example in examples %}
question: {{ example.question }}
SQL query: {{ example.sql }}
{% endfor %}
Your turn:
question: {{ question }}
SQL query:
Please only provide the SQL query and nothing else.
"#;

const NARRATION_TEMPLATE: &str = r#"Below is the schema of a {{ dialect }} database. Read the schema carefully for the table and column names of each table.
Consider the question, the SQL query and its result together.
Finally write a response in natural language only, by looking at the question and the result.

{{ schema }}

Here are some examples for you:
{% for example in examples %}
question: {{ example.question }}
SQL query: {{ example.sql }}
Result: {{ example.result }}
Response: {{ example.response }}
{% endfor %}
Your turn to write a response in natural language from the given result:
question: {{ question }}
SQL query: {{ query }}
Result: {{ result }}
Response:
"#;

pub struct PromptTemplates {
    env: Environment<'static>,
}

impl PromptTemplates {
    pub fn new() -> Result<Self, LlmError> {
        let mut env = Environment::new();
        env.add_template(SQL_TEMPLATE_NAME, SQL_TEMPLATE)?;
        env.add_template(NARRATION_TEMPLATE_NAME, NARRATION_TEMPLATE)?;
        Ok(Self { env })
    }

    pub fn render_sql(&self, context: &SqlPromptContext<'_>) -> Result<String, LlmError> {
        Ok(self.env.get_template(SQL_TEMPLATE_NAME)?.render(context)?)
    }

    pub fn render_narration(&self, context: &NarrationPromptContext<'_>) -> Result<String, LlmError> {
        Ok(self.env.get_template(NARRATION_TEMPLATE_NAME)?.render(context)?)
    }

    /// SQL generation prompt for `question` against `schema`.
    pub fn sql_prompt(&self, question: &str, schema: &SchemaDescription) -> Result<String, LlmError> {
        self.render_sql(&SqlPromptContext {
            dialect: DIALECT,
            schema: schema.as_str(),
            examples: SQL_EXAMPLES,
            question,
        })
    }

    /// Narration prompt quoting the question, the executed SQL and its rows.
    pub fn narration_prompt(
        &self,
        question: &str,
        query: &str,
        result: &ResultSet,
        schema: &SchemaDescription,
    ) -> Result<String, LlmError> {
        self.render_narration(&NarrationPromptContext {
            dialect: DIALECT,
            schema: schema.as_str(),
            examples: NARRATION_EXAMPLES,
            question,
            query,
            result: result.to_prompt_text(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Cell;

    fn schema() -> SchemaDescription {
        SchemaDescription::new("CREATE TABLE \"svcr_startups\" (\n\t\"city\" VARCHAR\n)")
    }

    #[test]
    fn sql_prompt_embeds_schema_examples_and_question() {
        let prompt = PromptTemplates::new()
            .unwrap()
            .sql_prompt("How many startups are in Zug?", &schema())
            .unwrap();

        assert!(prompt.contains("CREATE TABLE \"svcr_startups\""));
        assert!(prompt.contains("case sensitive"));
        assert!(prompt.contains("no underscores"));
        assert!(prompt.contains("GROUP BY"));
        assert!(prompt.contains("alias"));
        for example in SQL_EXAMPLES {
            assert!(prompt.contains(&format!("question: {}\nSQL query: {}", example.question, example.sql)));
        }
        assert!(prompt.contains("question: How many startups are in Zug?\nSQL query:"));

        // The live question comes after every worked example
        let last_example = prompt.find(SQL_EXAMPLES[SQL_EXAMPLES.len() - 1].sql).unwrap();
        assert!(prompt.find("How many startups are in Zug?").unwrap() > last_example);
    }

    #[test]
    fn question_text_is_not_escaped() {
        let prompt = PromptTemplates::new()
            .unwrap()
            .sql_prompt("Startups with \"AI\" & <ML> in the name?", &schema())
            .unwrap();
        assert!(prompt.contains("Startups with \"AI\" & <ML> in the name?"));
    }

    #[test]
    fn narration_prompt_embeds_query_and_row_tuples() {
        let result = ResultSet::new(
            vec!["city".into(), "n".into()],
            vec![vec![Cell::text("Zug"), Cell::Int(82)]],
        );
        let prompt = PromptTemplates::new()
            .unwrap()
            .narration_prompt(
                "How many startups are in Zug?",
                "SELECT city, COUNT(*) AS n FROM svcr_startups WHERE city = 'Zug' GROUP BY city;",
                &result,
                &schema(),
            )
            .unwrap();

        assert!(prompt.contains("CREATE TABLE \"svcr_startups\""));
        assert!(prompt.contains("natural language"));
        assert_eq!(prompt.matches("Response: ").count(), NARRATION_EXAMPLES.len());
        assert!(prompt.contains("Result: [(1000,)]\nResponse: There are 1000 orders in the database."));
        assert!(prompt.contains(
            "question: How many startups are in Zug?\nSQL query: SELECT city, COUNT(*) AS n FROM svcr_startups WHERE city = 'Zug' GROUP BY city;\nResult: [('Zug', 82)]\nResponse:"
        ));
    }

    #[test]
    fn rendering_is_deterministic() {
        let templates = PromptTemplates::new().unwrap();
        let a = templates.sql_prompt("q", &schema()).unwrap();
        let b = templates.sql_prompt("q", &schema()).unwrap();
        assert_eq!(a, b);
    }
}

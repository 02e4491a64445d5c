pub mod chart;

use crate::db::{QueryExecutor, ResultSet, SchemaDescription, SchemaProvider};
use crate::error::Result;
use crate::known_answers;
use crate::llm::LlmManager;
use crate::llm::prompts::PromptTemplates;
use crate::llm::LlmError;
use chart::ChartSpec;
use std::time::Instant;
use tracing::{debug, info};

/// Everything produced for one question.
#[derive(Debug, Clone, PartialEq)]
pub struct Answer {
    pub sql: String,
    pub result: ResultSet,
    pub response: String,
    pub chart_data: ChartSpec,
}

/// The question-to-insight pipeline: generate SQL, execute it, then narrate
/// and chart the rows.
///
/// Holds no per-request state; concurrent requests share only the pool and
/// the completion client.
pub struct Pipeline {
    schema: SchemaProvider,
    executor: QueryExecutor,
    llm: LlmManager,
    prompts: PromptTemplates,
}

impl Pipeline {
    pub fn new(
        schema: SchemaProvider,
        executor: QueryExecutor,
        llm: LlmManager,
    ) -> std::result::Result<Self, LlmError> {
        Ok(Self {
            schema,
            executor,
            llm,
            prompts: PromptTemplates::new()?,
        })
    }

    pub fn llm(&self) -> &LlmManager {
        &self.llm
    }

    pub async fn describe_schema(&self) -> Result<SchemaDescription> {
        self.schema.describe_schema().await
    }

    /// Asks the model for SQL answering `question`. The response is taken
    /// verbatim; the demo question short-circuits to the marker query.
    pub async fn generate_query(&self, question: &str, schema: &SchemaDescription) -> Result<String> {
        if let Some(marker) = known_answers::marker_for(question) {
            info!("Known demo question, skipping SQL generation");
            return Ok(marker.to_string());
        }

        let prompt = self.prompts.sql_prompt(question, schema)?;
        Ok(self.llm.complete(&prompt).await?)
    }

    pub async fn execute(&self, query: &str) -> Result<ResultSet> {
        self.executor.execute(query).await
    }

    /// Asks the model to describe `result` in prose.
    pub async fn narrate(
        &self,
        question: &str,
        query: &str,
        result: &ResultSet,
        schema: &SchemaDescription,
    ) -> Result<String> {
        let prompt = self.prompts.narration_prompt(question, query, result, schema)?;
        Ok(self.llm.complete(&prompt).await?)
    }

    /// Runs every stage for `question`. The first failing stage aborts the
    /// request; no partial answer is returned.
    pub async fn answer(&self, question: &str) -> Result<Answer> {
        let start_time = Instant::now();
        info!("Answering question: {}", question);

        let schema = self.describe_schema().await?;
        debug!("Schema description is {} chars", schema.as_str().len());

        let sql = self.generate_query(question, &schema).await?;
        info!("Generated SQL: {}", sql);

        let result = self.execute(&sql).await?;

        // The chart is cheap and may fail on coercion, so build it before
        // spending a second model call.
        let chart_data = chart::to_chart_spec(&result, &sql)?;
        let response = self.narrate(question, &sql, &result, &schema).await?;

        info!(
            "Answered in {}ms with {} rows ({:?} chart)",
            start_time.elapsed().as_millis(),
            result.len(),
            chart_data.kind
        );

        Ok(Answer {
            sql,
            result,
            response,
            chart_data,
        })
    }
}

/// Fully canned answer for the demo question, built without the database
/// or the model.
pub fn canned_answer(question: &str) -> Option<Answer> {
    if !known_answers::is_demo_question(question) {
        return None;
    }

    let result = known_answers::city_counts();
    let chart_data = chart::to_chart_spec(&result, known_answers::CANNED_CHART_QUERY).ok()?;

    Some(Answer {
        sql: known_answers::CANNED_SQL.to_string(),
        result,
        response: known_answers::CANNED_RESPONSE.to_string(),
        chart_data,
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::db::executor::tests::startup_pool;
    use crate::db::{Cell, DbPool};
    use crate::error::PipelineError;
    use crate::llm::tests::ScriptedCompleter;
    use chart::ChartKind;
    use std::time::Duration;

    pub(crate) fn pipeline_with(pool: DbPool, fake: &ScriptedCompleter) -> Pipeline {
        Pipeline::new(
            SchemaProvider::new(pool.clone()),
            QueryExecutor::new(pool, Duration::from_secs(5)),
            LlmManager::from_completer(Box::new(fake.clone()), "scripted", "test-model"),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn answers_with_sql_rows_narration_and_chart() {
        let fake = ScriptedCompleter::replying(&[
            "SELECT city, COUNT(*) AS startups FROM svcr_startups GROUP BY city ORDER BY startups DESC",
            "Zurich has 2 startups and Geneva has 1.",
        ]);
        let answer = pipeline_with(startup_pool(), &fake)
            .answer("How many startups per city?")
            .await
            .unwrap();

        assert_eq!(
            answer.result.rows,
            vec![
                vec![Cell::text("Zurich"), Cell::Int(2)],
                vec![Cell::text("Geneva"), Cell::Int(1)],
            ]
        );
        assert_eq!(answer.response, "Zurich has 2 startups and Geneva has 1.");
        assert_eq!(answer.chart_data.kind, ChartKind::Bar);
        assert_eq!(answer.chart_data.data.labels, vec!["Zurich", "Geneva"]);

        let prompts = fake.prompts();
        assert_eq!(prompts.len(), 2);
        assert!(prompts[0].contains("CREATE TABLE \"svcr_startups\""));
        assert!(prompts[0].contains("question: How many startups per city?"));
        assert!(prompts[1].contains("CREATE TABLE \"svcr_startups\""));
        assert!(prompts[1].contains(&format!("SQL query: {}", answer.sql)));
        assert!(prompts[1].contains("Result: [('Zurich', 2), ('Geneva', 1)]"));
    }

    #[tokio::test]
    async fn demo_question_skips_generation_and_database() {
        let fake = ScriptedCompleter::replying(&["Zürich leads with 338 startups."]);
        let pipeline = pipeline_with(startup_pool(), &fake);

        let answer = pipeline
            .answer("Which cities in Switzerland have the most number of startups?")
            .await
            .unwrap();

        assert_eq!(answer.sql, known_answers::MARKER_QUERY);
        assert_eq!(answer.result, known_answers::city_counts());
        assert_eq!(answer.chart_data.kind, ChartKind::Doughnut);

        // Only the narration call reached the model
        let prompts = fake.prompts();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("('Zürich', 338)"));
    }

    #[tokio::test]
    async fn generate_query_returns_marker_without_model_call() {
        let fake = ScriptedCompleter::default();
        let pipeline = pipeline_with(startup_pool(), &fake);
        let schema = SchemaDescription::new("");

        let sql = pipeline
            .generate_query("  which cities in switzerland have the most number of startups?  ", &schema)
            .await
            .unwrap();

        assert_eq!(sql, known_answers::MARKER_QUERY);
        assert!(fake.prompts().is_empty());
    }

    #[tokio::test]
    async fn generated_text_is_executed_verbatim() {
        let fake = ScriptedCompleter::replying(&["Here is the query: SELECT 1"]);
        let err = pipeline_with(startup_pool(), &fake)
            .answer("anything")
            .await
            .unwrap_err();

        assert!(matches!(err, PipelineError::QueryExecution(_)));
        // Narration never ran
        assert_eq!(fake.prompts().len(), 1);
    }

    #[tokio::test]
    async fn completion_failure_aborts_before_execution() {
        let fake = ScriptedCompleter::new(vec![Err(LlmError::Connection("refused".into()))]);
        let err = pipeline_with(startup_pool(), &fake)
            .answer("How many startups?")
            .await
            .unwrap_err();

        assert!(matches!(err, PipelineError::Generation(LlmError::Connection(_))));
        assert_eq!(err.to_string(), "LLM connection error: refused");
    }

    #[tokio::test]
    async fn empty_completion_is_a_generation_error() {
        let fake = ScriptedCompleter::replying(&["   "]);
        let err = pipeline_with(startup_pool(), &fake)
            .answer("How many startups?")
            .await
            .unwrap_err();

        assert!(matches!(err, PipelineError::Generation(LlmError::EmptyResponse)));
    }

    #[tokio::test]
    async fn narration_failure_discards_everything() {
        let fake = ScriptedCompleter::new(vec![
            Ok("SELECT COUNT(*) AS total FROM svcr_startups".to_string()),
            Err(LlmError::Timeout(120)),
        ]);
        let err = pipeline_with(startup_pool(), &fake)
            .answer("How many startups?")
            .await
            .unwrap_err();

        assert!(matches!(err, PipelineError::Generation(LlmError::Timeout(120))));
    }

    #[tokio::test]
    async fn coercion_failure_skips_narration() {
        let fake = ScriptedCompleter::replying(&[
            "SELECT name, city FROM svcr_startups ORDER BY name",
            "never used",
        ]);
        let err = pipeline_with(startup_pool(), &fake)
            .answer("List startups and their cities")
            .await
            .unwrap_err();

        assert!(matches!(err, PipelineError::Coercion { .. }));
        assert_eq!(fake.prompts().len(), 1);
    }

    #[test]
    fn canned_answer_only_for_demo_question() {
        assert!(canned_answer("How many startups?").is_none());

        let answer = canned_answer("Which cities in Switzerland have the most number of startups?").unwrap();
        assert_eq!(answer.sql, known_answers::CANNED_SQL);
        assert_eq!(answer.response, known_answers::CANNED_RESPONSE);
        assert_eq!(answer.chart_data.kind, ChartKind::Bar);
        assert_eq!(answer.chart_data.data.datasets[0].label, "Count");
        assert_eq!(answer.chart_data.data.labels.len(), 8);
        assert_eq!(answer.chart_data.data.datasets[0].data[0], 338.0);
    }
}

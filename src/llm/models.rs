use serde::Serialize;

/// A worked question → SQL pair shown to the model before the real question.
#[derive(Debug, Serialize)]
pub struct SqlExample {
    pub question: &'static str,
    pub sql: &'static str,
}

/// A worked question + SQL + result → prose example for narration.
#[derive(Debug, Serialize)]
pub struct NarrationExample {
    pub question: &'static str,
    pub sql: &'static str,
    pub result: &'static str,
    pub response: &'static str,
}

/// Everything the SQL generation prompt is rendered from.
#[derive(Debug, Serialize)]
pub struct SqlPromptContext<'a> {
    pub dialect: &'a str,
    pub schema: &'a str,
    pub examples: &'a [SqlExample],
    pub question: &'a str,
}

/// Everything the narration prompt is rendered from.
#[derive(Debug, Serialize)]
pub struct NarrationPromptContext<'a> {
    pub dialect: &'a str,
    pub schema: &'a str,
    pub examples: &'a [NarrationExample],
    pub question: &'a str,
    pub query: &'a str,
    pub result: String,
}

pub const SQL_EXAMPLES: &[SqlExample] = &[
    SqlExample {
        question: "What is the total number of startups funded in Switzerland?",
        sql: "SELECT COUNT(*) as total FROM svcr_startups;",
    },
    SqlExample {
        question: "How many startups were funded each year between 2015 and 2020?",
        sql: "SELECT funding_year, COUNT(*) as count FROM svcr_startups WHERE funding_year BETWEEN 2015 AND 2020 GROUP BY funding_year ORDER BY funding_year;",
    },
    SqlExample {
        question: "What is the average funding amount by sector?",
        sql: "SELECT sector, AVG(funding_amount) as avg_funding FROM svcr_startups GROUP BY sector ORDER BY avg_funding DESC;",
    },
    SqlExample {
        question: "Show me the yearly trend of startup funding",
        sql: "SELECT funding_year, COUNT(*) as startups, SUM(funding_amount) as total_funding FROM svcr_startups GROUP BY funding_year ORDER BY funding_year;",
    },
    SqlExample {
        question: "What is the distribution of funding types by year?",
        sql: "SELECT funding_year, funding_type, COUNT(*) as count FROM svcr_startups GROUP BY funding_year, funding_type ORDER BY funding_year, count DESC;",
    },
];

pub const NARRATION_EXAMPLES: &[NarrationExample] = &[
    NarrationExample {
        question: "how many orders we have in database",
        sql: "SELECT COUNT(*) FROM mytable;",
        result: "[(1000,)]",
        response: "There are 1000 orders in the database.",
    },
    NarrationExample {
        question: "how many orders are from United States",
        sql: "SELECT COUNT(*) FROM mytable WHERE \"Country\"='United States';",
        result: "[(100,)]",
        response: "There are 100 orders from the United States.",
    },
    NarrationExample {
        question: "Which cities in Switzerland have the highest concentration of startups (Top 3)?",
        sql: "SELECT city, COUNT(*) AS startup_count FROM svcr_startups GROUP BY city ORDER BY startup_count DESC LIMIT 3;",
        result: "[('Zurich', 100), ('Geneva', 80), ('Basel', 70)]",
        response: "Zurich has the most startups with 100, followed by Geneva with 80 and Basel with 70.",
    },
];

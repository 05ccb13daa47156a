//! Neo4j connection client.

use anyhow::{Context, Result};
use neo4rs::{ConfigBuilder, DetachedRowStream, Graph, Query, Row};
use serde::Deserialize;

/// Configuration for connecting to Neo4j.
#[derive(Debug, Clone, Deserialize)]
pub struct GraphConfig {
    pub uri: String,
    pub user: String,
    pub password: String,
    /// Database name; the server default when unset.
    #[serde(default)]
    pub database: Option<String>,
    #[serde(default = "default_fetch_size")]
    pub fetch_size: usize,
}

fn default_fetch_size() -> usize {
    500
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            uri: "bolt://localhost:7687".to_string(),
            user: "neo4j".to_string(),
            password: "password".to_string(),
            database: None,
            fetch_size: default_fetch_size(),
        }
    }
}

/// Client for read-only Neo4j queries.
#[derive(Clone)]
pub struct GraphClient {
    graph: Graph,
}

impl GraphClient {
    /// Connect and verify the server answers.
    ///
    /// `Graph::connect` only builds the pool, so a `RETURN 1` ping forces a
    /// real handshake and surfaces connectivity failures up front.
    pub async fn connect(config: &GraphConfig) -> Result<Self> {
        let mut builder = ConfigBuilder::default()
            .uri(&config.uri)
            .user(&config.user)
            .password(&config.password)
            .max_connections(2)
            .fetch_size(config.fetch_size);
        if let Some(db) = &config.database {
            builder = builder.db(db.as_str());
        }
        let neo4j_config = builder.build().context("Failed to build Neo4j config")?;

        let graph = Graph::connect(neo4j_config)
            .await
            .context("Failed to create Neo4j connection pool")?;

        graph
            .run(Query::new("RETURN 1".to_string()))
            .await
            .with_context(|| format!("Neo4j at {} is not responding to queries", config.uri))?;

        Ok(Self { graph })
    }

    /// Execute a Cypher query and return results as rows.
    pub async fn query(&self, query: Query) -> Result<Vec<Row>> {
        let mut result = self.graph.execute(query).await.context("Neo4j query failed")?;

        let mut rows = Vec::new();
        while let Some(row) = result.next().await.context("Failed to read Neo4j result")? {
            rows.push(row);
        }
        Ok(rows)
    }

    /// Open a forward-only cursor over a query's rows.
    pub async fn stream(&self, query: Query) -> Result<DetachedRowStream> {
        self.graph.execute(query).await.context("Neo4j query failed")
    }
}

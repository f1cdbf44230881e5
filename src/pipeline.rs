use crate::config::PipelineConfig;
use crate::constants::{RESTAURANT_COLUMNS, RESTAURANT_ID, USER_COLUMNS, USER_ID};
use crate::error::Result;
use crate::ingestion::{extract_restaurants, load_delimited, load_json_records};
use crate::join::{left_join, DuplicateKeyPolicy, JoinOutcome};
use crate::observer::{PipelineEvent, PipelineObserver, Stage};
use crate::output::{write_delimited, WriteSummary};
use crate::stats::DatasetStatistics;
use crate::table::Table;
use chrono::{DateTime, Utc};
use metrics::{counter, histogram};
use serde::Serialize;
use tracing::{info, instrument};
use uuid::Uuid;

/// Result of a complete pipeline run
#[derive(Debug, Clone, Serialize)]
pub struct PipelineResult {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub orders_rows: usize,
    pub users_rows: usize,
    pub restaurants_rows: usize,
    pub restaurants_skipped: usize,
    pub user_join: JoinOutcome,
    pub restaurant_join: JoinOutcome,
    pub output: WriteSummary,
    pub statistics: DatasetStatistics,
    #[serde(skip)]
    pub merged: Table,
}

/// The two joins applied to already-loaded tables.
#[derive(Debug, Clone)]
pub struct Merged {
    pub table: Table,
    pub user_join: JoinOutcome,
    pub restaurant_join: JoinOutcome,
}

/// Runs load, join, report and write once, in order. The first failing
/// stage aborts the run and nothing is written.
pub struct MergePipeline<'a> {
    config: PipelineConfig,
    observer: &'a dyn PipelineObserver,
}

impl<'a> MergePipeline<'a> {
    pub fn new(config: PipelineConfig, observer: &'a dyn PipelineObserver) -> Self {
        Self { config, observer }
    }

    #[instrument(skip(self), fields(base_dir = %self.config.base_dir.display()))]
    pub fn run(&self) -> Result<PipelineResult> {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let t_run = std::time::Instant::now();
        let delimiter = self.config.delimiter_byte()?;
        info!(%run_id, "🚀 Starting merge run");
        counter!("delivery_merge_runs_total").increment(1);

        self.emit(PipelineEvent::StageStarted {
            stage: Stage::LoadOrders,
        });
        let orders_path = self.config.orders_path();
        let orders = load_delimited(&orders_path, delimiter)?;
        self.loaded(Stage::LoadOrders, orders_path, &orders);

        self.emit(PipelineEvent::StageStarted {
            stage: Stage::LoadUsers,
        });
        let users_path = self.config.users_path();
        let users = load_json_records(&users_path)?;
        self.loaded(Stage::LoadUsers, users_path, &users);

        self.emit(PipelineEvent::StageStarted {
            stage: Stage::ExtractRestaurants,
        });
        let restaurants_path = self.config.restaurants_path();
        let extraction = extract_restaurants(&restaurants_path, self.config.extraction)?;
        self.loaded(
            Stage::ExtractRestaurants,
            restaurants_path,
            &extraction.table,
        );
        if extraction.skipped > 0 {
            self.emit(PipelineEvent::StatementsSkipped {
                count: extraction.skipped,
            });
        }

        let merged = merge_tables(
            &orders,
            &users,
            &extraction.table,
            self.config.duplicate_keys,
            self.observer,
        )?;

        self.emit(PipelineEvent::StageStarted {
            stage: Stage::Statistics,
        });
        let statistics = DatasetStatistics::compute(&merged.table);

        self.emit(PipelineEvent::StageStarted { stage: Stage::Write });
        let output = write_delimited(&merged.table, &self.config.output_path(), delimiter)?;
        self.emit(PipelineEvent::OutputWritten {
            path: output.path.clone(),
            rows: output.rows,
            bytes: output.bytes,
        });

        histogram!("delivery_merge_run_duration_seconds").record(t_run.elapsed().as_secs_f64());
        info!(%run_id, "✅ Merge run complete");

        Ok(PipelineResult {
            run_id,
            started_at,
            finished_at: Utc::now(),
            orders_rows: orders.row_count(),
            users_rows: users.row_count(),
            restaurants_rows: extraction.table.row_count(),
            restaurants_skipped: extraction.skipped,
            user_join: merged.user_join,
            restaurant_join: merged.restaurant_join,
            output,
            statistics,
            merged: merged.table,
        })
    }

    fn emit(&self, event: PipelineEvent) {
        self.observer.on_event(&event);
    }

    fn loaded(&self, stage: Stage, path: std::path::PathBuf, table: &Table) {
        self.emit(PipelineEvent::TableLoaded {
            stage,
            path,
            rows: table.row_count(),
            columns: table.columns().to_vec(),
        });
    }
}

/// Orders ⟕ users on `user_id`, then ⟕ restaurants on `restaurant_id`.
pub fn merge_tables(
    orders: &Table,
    users: &Table,
    restaurants: &Table,
    policy: DuplicateKeyPolicy,
    observer: &dyn PipelineObserver,
) -> Result<Merged> {
    observer.on_event(&PipelineEvent::StageStarted {
        stage: Stage::JoinUsers,
    });
    let user_columns: Vec<&str> = std::iter::once(USER_ID).chain(USER_COLUMNS).collect();
    let (with_users, user_join) = left_join(orders, users, USER_ID, &user_columns, policy)?;
    observer.on_event(&PipelineEvent::Joined {
        stage: Stage::JoinUsers,
        outcome: user_join.clone(),
        columns: with_users.column_count(),
    });

    observer.on_event(&PipelineEvent::StageStarted {
        stage: Stage::JoinRestaurants,
    });
    let restaurant_columns: Vec<&str> = std::iter::once(RESTAURANT_ID)
        .chain(RESTAURANT_COLUMNS)
        .collect();
    let (table, restaurant_join) =
        left_join(&with_users, restaurants, RESTAURANT_ID, &restaurant_columns, policy)?;
    observer.on_event(&PipelineEvent::Joined {
        stage: Stage::JoinRestaurants,
        outcome: restaurant_join.clone(),
        columns: table.column_count(),
    });

    Ok(Merged {
        table,
        user_join,
        restaurant_join,
    })
}

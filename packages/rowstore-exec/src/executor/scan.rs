//! Scan executor: candidate, predicate, offset, limit, projection.

use std::sync::Arc;

use serde_json::Value as JsonValue;
use tracing::debug;

use rowstore_core::database::TableCatalog;
use rowstore_core::error::DbError;
use rowstore_core::factory::TableFactory;
use rowstore_core::schema::TupleSchema;
use rowstore_core::table::{Table, TempTableLimits};
use rowstore_core::types::Value;

use super::strategy::{IndexScan, ScanStrategy, SeqScan};
use crate::expression::ExpressionLoader;
use crate::plan::{PlanNodeType, ScanPlanNode};

/// Lifecycle of a scan executor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutorState {
    Uninitialized,
    Initialized,
    Executing,
    Exhausted,
}

/// Output shape bound by `init`.
#[derive(Debug, Clone)]
struct BoundOutput {
    schema: TupleSchema,
    column_names: Vec<String>,
}

/// Scan over one table with an injected candidate strategy.
#[derive(Debug)]
pub struct ScanExecutor<S: ScanStrategy> {
    node: ScanPlanNode,
    strategy: S,
    state: ExecutorState,
    output: Option<BoundOutput>,
    limits: Option<Arc<TempTableLimits>>,
}

impl<S: ScanStrategy> ScanExecutor<S> {
    pub fn new(node: ScanPlanNode, strategy: S) -> Self {
        Self {
            node,
            strategy,
            state: ExecutorState::Uninitialized,
            output: None,
            limits: None,
        }
    }

    pub fn plan_node(&self) -> &ScanPlanNode {
        &self.node
    }

    pub fn strategy(&self) -> &S {
        &self.strategy
    }

    pub fn state(&self) -> ExecutorState {
        self.state
    }

    /// Output column names; empty before `init`.
    pub fn output_column_names(&self) -> &[String] {
        self.output
            .as_ref()
            .map(|o| o.column_names.as_slice())
            .unwrap_or(&[])
    }

    pub fn output_schema(&self) -> Option<&TupleSchema> {
        self.output.as_ref().map(|o| &o.schema)
    }

    fn resolve_table<'c>(&self, catalog: &'c dyn TableCatalog) -> Result<&'c Table, DbError> {
        catalog.table(&self.node.target_table_name).ok_or_else(|| {
            DbError::Initialization(format!(
                "scan node {} references unknown table '{}'",
                self.node.id, self.node.target_table_name
            ))
        })
    }

    /// Binds the executor to its target table.
    ///
    /// Resolves the table, derives the output schema from the inline
    /// projection (or the table's own schema), then hands the table to the
    /// strategy's `init_more`.
    ///
    /// # Arguments
    /// * `catalog` - Tables visible to the plan
    /// * `limits` - Memory accounting for temp tables this executor fills
    pub fn init(
        &mut self,
        catalog: &dyn TableCatalog,
        limits: Option<Arc<TempTableLimits>>,
    ) -> Result<(), DbError> {
        let table = self.resolve_table(catalog)?;

        let output = match &self.node.projection {
            Some(projection) => BoundOutput {
                schema: projection.output_schema(table.schema())?,
                column_names: projection.column_names(),
            },
            None => BoundOutput {
                schema: table.schema().clone(),
                column_names: table.column_names().to_vec(),
            },
        };
        if let Some(projection) = &self.node.projection {
            if let Some(&column) = projection
                .column_indices()
                .and_then(|indices| indices.iter().find(|&&c| c >= table.column_count()))
            {
                return Err(DbError::Initialization(format!(
                    "projection reads column {} of table '{}' with {} columns",
                    column,
                    table.name(),
                    table.column_count()
                )));
            }
        }

        self.strategy.init_more(table)?;
        self.output = Some(output);
        self.limits = limits;
        self.state = ExecutorState::Initialized;
        debug!(
            "Initialized {:?} node {} over '{}' ({} output columns)",
            self.node.node_type,
            self.node.id,
            self.node.target_table_name,
            self.output_column_names().len()
        );
        Ok(())
    }

    /// Starts an execution and returns its rows as a pull iterator.
    ///
    /// May be called again after the previous run, with new parameters.
    pub fn execute<'c>(
        &'c mut self,
        catalog: &'c dyn TableCatalog,
        params: &'c [Value],
    ) -> Result<ScanRun<'c, S>, DbError> {
        if self.state == ExecutorState::Uninitialized {
            return Err(DbError::Initialization(format!(
                "scan node {} executed before init",
                self.node.id
            )));
        }
        let table = self.resolve_table(catalog)?;
        let (limit, offset) = match &self.node.limit {
            Some(limit) => limit.resolve(params)?,
            None => (None, 0),
        };
        self.strategy.begin(table, params)?;
        self.state = ExecutorState::Executing;
        Ok(ScanRun {
            executor: self,
            table,
            params,
            limit,
            offset,
            skipped: 0,
            emitted: 0,
            done: false,
        })
    }

    /// Runs the scan into a new temp table shaped like the output.
    pub fn execute_to_temp(
        &mut self,
        catalog: &dyn TableCatalog,
        params: &[Value],
    ) -> Result<Table, DbError> {
        let output = self.output.clone().ok_or_else(|| {
            DbError::Initialization(format!("scan node {} executed before init", self.node.id))
        })?;
        let database_id = self.resolve_table(catalog)?.database_id();
        let name = format!("{}_scan_{}", self.node.target_table_name, self.node.id);
        let mut temp = TableFactory::get_temp_table(
            database_id,
            &name,
            output.schema,
            output.column_names,
            self.limits.clone(),
        );
        for row in self.execute(catalog, params)? {
            temp.insert_values(&row?)?;
        }
        Ok(temp)
    }

    fn finish(&mut self, emitted: usize) {
        self.state = ExecutorState::Exhausted;
        debug!(
            "Scan node {} over '{}' emitted {} rows",
            self.node.id, self.node.target_table_name, emitted
        );
    }
}

/// One execution of a [`ScanExecutor`].
pub struct ScanRun<'c, S: ScanStrategy> {
    executor: &'c mut ScanExecutor<S>,
    table: &'c Table,
    params: &'c [Value],
    limit: Option<usize>,
    offset: usize,
    skipped: usize,
    emitted: usize,
    done: bool,
}

impl<S: ScanStrategy> ScanRun<'_, S> {
    fn stop(&mut self) {
        if !self.done {
            self.done = true;
            self.executor.finish(self.emitted);
        }
    }
}

impl<S: ScanStrategy> Iterator for ScanRun<'_, S> {
    type Item = Result<Vec<Value>, DbError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        if self.limit.is_some_and(|limit| self.emitted >= limit) {
            self.stop();
            return None;
        }
        loop {
            let Some(row) = self.executor.strategy.next_candidate(self.table) else {
                self.stop();
                return None;
            };
            let Some(tuple) = self.table.tuple(row) else {
                continue;
            };
            if let Some(predicate) = &self.executor.node.predicate {
                match predicate.eval(Some(&tuple), self.params) {
                    Ok(v) if v.is_true() => {}
                    Ok(_) => continue,
                    Err(e) => {
                        self.stop();
                        return Some(Err(e));
                    }
                }
            }
            if self.skipped < self.offset {
                self.skipped += 1;
                continue;
            }
            let output = match &self.executor.node.projection {
                Some(projection) => projection.project(&tuple, self.params),
                None => Ok(tuple.values()),
            };
            if output.is_err() {
                self.stop();
                return Some(output);
            }
            self.emitted += 1;
            return Some(output);
        }
    }
}

/// Scan executor with its strategy chosen from the plan node type.
#[derive(Debug)]
pub enum AnyScanExecutor {
    Seq(ScanExecutor<SeqScan>),
    Index(ScanExecutor<IndexScan>),
}

impl AnyScanExecutor {
    pub fn from_plan(mut node: ScanPlanNode) -> Result<Self, DbError> {
        match (node.node_type, node.index.take()) {
            (PlanNodeType::IndexScan, Some(spec)) => {
                Ok(AnyScanExecutor::Index(ScanExecutor::new(node, IndexScan::new(spec))))
            }
            (PlanNodeType::SeqScan, None) => Ok(AnyScanExecutor::Seq(ScanExecutor::new(node, SeqScan::new()))),
            (node_type, _) => Err(DbError::MalformedPlan(format!(
                "scan node {} of type {:?} has inconsistent index fields",
                node.id, node_type
            ))),
        }
    }

    /// Loads the node description and builds its executor.
    pub fn load(json: &JsonValue, loader: &dyn ExpressionLoader) -> Result<Self, DbError> {
        Self::from_plan(ScanPlanNode::load(json, loader)?)
    }

    pub fn state(&self) -> ExecutorState {
        match self {
            AnyScanExecutor::Seq(e) => e.state(),
            AnyScanExecutor::Index(e) => e.state(),
        }
    }

    pub fn output_column_names(&self) -> &[String] {
        match self {
            AnyScanExecutor::Seq(e) => e.output_column_names(),
            AnyScanExecutor::Index(e) => e.output_column_names(),
        }
    }

    pub fn init(
        &mut self,
        catalog: &dyn TableCatalog,
        limits: Option<Arc<TempTableLimits>>,
    ) -> Result<(), DbError> {
        match self {
            AnyScanExecutor::Seq(e) => e.init(catalog, limits),
            AnyScanExecutor::Index(e) => e.init(catalog, limits),
        }
    }

    pub fn execute<'c>(
        &'c mut self,
        catalog: &'c dyn TableCatalog,
        params: &'c [Value],
    ) -> Result<Box<dyn Iterator<Item = Result<Vec<Value>, DbError>> + 'c>, DbError> {
        Ok(match self {
            AnyScanExecutor::Seq(e) => Box::new(e.execute(catalog, params)?),
            AnyScanExecutor::Index(e) => Box::new(e.execute(catalog, params)?),
        })
    }

    /// Runs the scan and collects every output row.
    pub fn collect_rows(
        &mut self,
        catalog: &dyn TableCatalog,
        params: &[Value],
    ) -> Result<Vec<Vec<Value>>, DbError> {
        self.execute(catalog, params)?.collect()
    }

    pub fn execute_to_temp(
        &mut self,
        catalog: &dyn TableCatalog,
        params: &[Value],
    ) -> Result<Table, DbError> {
        match self {
            AnyScanExecutor::Seq(e) => e.execute_to_temp(catalog, params),
            AnyScanExecutor::Index(e) => e.execute_to_temp(catalog, params),
        }
    }
}

//! Customer-satisfaction survey analysis
//!
//! Loads a survey export, cleans it, and produces descriptive tables,
//! automatically selected hypothesis tests with effect sizes, power and
//! post-hoc comparisons, and charts exported to Excel, PDF, PNG and JSON.

// Core data structures and the crate error type
pub mod core;

// Column-oriented survey table
pub mod dataframe;

// Configuration, loading and cleaning
pub mod cleaning;
pub mod config;
pub mod io;

// Statistics and the test selector
pub mod stats;

// Charts and report generation
pub mod report;
pub mod vis;

pub use crate::config::AnalysisConfig;
pub use crate::core::column::{Column, ColumnType};
pub use crate::core::error::{Error, Result};
pub use crate::dataframe::DataFrame;
pub use crate::report::{ReportRunner, RunSummary, WorkItem};
pub use crate::stats::{
    check_independence, check_normality, check_variance_homogeneity, run_selection, select_test,
    ContingencyResult, ContingencyTable, GroupComparison, PostHocResult, PowerAnalysisResult,
    Sample, SelectionResult, SelectorOptions, TestOutcome,
};
pub use crate::vis::{Chart, FigureCollector};

use clap::{Args, Parser, Subcommand, ValueEnum};

use cobra_core::{CobraError, NodeClass, NodeFilter, TaskFilter, TaskType};

/// COBRA task offloading scheduler for Edge and UAV fleets.
#[derive(Parser, Debug)]
#[command(name = "cobra-server", version, about = "Resource-aware task scheduler for Edge and UAV nodes")]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the HTTP server (default).
    Serve,

    /// Register the demo fleet.
    Seed {
        /// Number of Edge nodes
        #[arg(long, env = "SEED_EDGE_NODES", default_value_t = 3)]
        edge: usize,

        /// Number of UAV nodes
        #[arg(long, env = "SEED_UAV_NODES", default_value_t = 6)]
        uav: usize,
    },

    /// Push a generated task mix through the scheduler.
    Simulate {
        #[arg(long, default_value_t = 100)]
        tasks: usize,

        /// Dispatch policy (first-available, round-robin, random, ecp, energy-aware, cobra)
        #[arg(long)]
        policy: Option<String>,

        /// Dispatches in flight at once
        #[arg(long, env = "SIM_CONCURRENCY", default_value_t = 4)]
        concurrency: usize,

        /// Retries per task on conflicts or an exhausted fleet
        #[arg(long, env = "SIM_MAX_RETRIES", default_value_t = 5)]
        max_retries: u32,

        /// Register the demo fleet before running
        #[arg(long)]
        seed: bool,
    },

    /// Remove records in bulk: tasks, nodes or all.
    Clear { scope: String },

    /// Print ledger records as JSON lines.
    List {
        #[arg(value_enum)]
        target: ListTarget,

        #[command(flatten)]
        filter: ListFilter,
    },
}

/// Narrowing flags for `list`. Flags that do not apply to the target are ignored.
#[derive(Args, Debug, Default)]
pub struct ListFilter {
    #[arg(long)]
    pub node_id: Option<String>,

    /// Edge or UAV (nodes only)
    #[arg(long)]
    pub class: Option<NodeClass>,

    /// Node status (Available, Busy, Unavailable) or task status (Completed)
    #[arg(long)]
    pub status: Option<String>,

    /// Keep nodes with strictly more battery than this (nodes only)
    #[arg(long)]
    pub battery_above: Option<f64>,

    /// Task type such as UC or HRLLC (tasks only)
    #[arg(long)]
    pub task_type: Option<TaskType>,
}

impl ListFilter {
    pub fn nodes(&self) -> Result<NodeFilter, CobraError> {
        Ok(NodeFilter {
            node_id: self.node_id.clone(),
            class: self.class,
            status: self.status.as_deref().map(str::parse).transpose()?,
            battery_above: self.battery_above,
        })
    }

    pub fn tasks(&self) -> Result<TaskFilter, CobraError> {
        Ok(TaskFilter {
            node_id: self.node_id.clone(),
            task_type: self.task_type,
            status: self.status.as_deref().map(str::parse).transpose()?,
        })
    }
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ListTarget {
    Nodes,
    Tasks,
}

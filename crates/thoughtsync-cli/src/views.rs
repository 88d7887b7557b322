//! Terminal views refreshed from change notifications.
//!
//! A `ViewLoader` renders a short summary of the dataset and then runs its
//! post-load hooks. Role-specific behaviour is added by appending hooks when
//! the loader is built, never by replacing the loader afterwards.

use std::io::Write;
use std::sync::Mutex;

use anyhow::Result;
use chrono::Utc;
use thoughtsync_core::models::Dataset;
use thoughtsync_core::utils::{age_display, format_timestamp, truncate_string};
use thoughtsync_core::{Refreshable, Role};

/// How many thought titles the summary lists.
const RECENT_THOUGHTS_SHOWN: usize = 5;

/// Maximum width of a listed title.
const TITLE_WIDTH: usize = 60;

pub type PostLoadHook = Box<dyn Fn(&Dataset) -> Option<String> + Send + Sync>;

pub struct ViewLoader<W: Write + Send> {
    out: Mutex<W>,
    post_load_hooks: Vec<PostLoadHook>,
}

impl<W: Write + Send> ViewLoader<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
            post_load_hooks: Vec::new(),
        }
    }

    /// Append a hook that runs after every load. A returned line is printed
    /// below the summary.
    pub fn with_hook(
        mut self,
        hook: impl Fn(&Dataset) -> Option<String> + Send + Sync + 'static,
    ) -> Self {
        self.post_load_hooks.push(Box::new(hook));
        self
    }

    /// Loader with the hooks appropriate for `role`.
    pub fn for_role(out: W, role: Role) -> Self {
        let loader = Self::new(out);
        match role {
            Role::Consumer => loader.with_hook(update_time_line),
            Role::Producer => loader.with_hook(|_| {
                Some("Run `thoughtsync export` and upload thought-data.json to publish.".to_string())
            }),
        }
    }

    pub fn render(&self, dataset: &Dataset) -> Vec<String> {
        let stats = dataset.stats();
        let mut lines = vec![format!(
            "{} thoughts, {} models, {} tags",
            stats.thoughts, stats.models, stats.tags
        )];

        for thought in dataset.thoughts.iter().rev().take(RECENT_THOUGHTS_SHOWN) {
            let title = thought.title().unwrap_or("(untitled)");
            lines.push(format!("  - {}", truncate_string(title, TITLE_WIDTH)));
        }

        lines.extend(self.post_load_hooks.iter().filter_map(|hook| hook(dataset)));
        lines
    }
}

impl<W: Write + Send> Refreshable for ViewLoader<W> {
    fn refresh(&self, dataset: &Dataset) -> Result<()> {
        let lines = self.render(dataset);
        let mut out = self
            .out
            .lock()
            .map_err(|_| anyhow::anyhow!("view output poisoned"))?;
        for line in lines {
            writeln!(out, "{}", line)?;
        }
        out.flush()?;
        Ok(())
    }
}

/// "Data updated: <time> (<age>)" for consumers.
pub fn update_time_line(dataset: &Dataset) -> Option<String> {
    let at = dataset.published_at()?;
    Some(format!(
        "Data updated: {} ({})",
        format_timestamp(at),
        age_display(at, Utc::now())
    ))
}

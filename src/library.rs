// Saved charts list: delete and share outcomes

use crate::api::{DeleteResponse, SavedChart, ShareResponse, ShareStep};
use crate::state::Notification;
use log::{debug, info, warn};

/// The user's saved charts and the deletes still waiting on the service
#[derive(Debug, Clone, Default)]
pub struct ChartLibrary {
    charts: Vec<SavedChart>,
    deleting: Vec<i64>,
}

impl ChartLibrary {
    pub fn new(charts: Vec<SavedChart>) -> Self {
        Self {
            charts,
            deleting: Vec::new(),
        }
    }

    pub fn charts(&self) -> &[SavedChart] {
        &self.charts
    }

    pub fn get(&self, id: i64) -> Option<&SavedChart> {
        self.charts.iter().find(|c| c.id == id)
    }

    pub fn is_empty(&self) -> bool {
        self.charts.is_empty()
    }

    /// A chart with a delete in flight is greyed out and not clickable
    pub fn is_deleting(&self, id: i64) -> bool {
        self.deleting.contains(&id)
    }

    /// Mark a chart as being deleted. Returns false for unknown charts or a
    /// delete already in flight, in which case no request should be sent.
    pub fn begin_delete(&mut self, id: i64) -> bool {
        if self.get(id).is_none() || self.is_deleting(id) {
            debug!("ignoring delete of chart {}", id);
            return false;
        }
        self.deleting.push(id);
        true
    }

    /// Apply the service's answer to a delete request.
    ///
    /// On success the chart leaves the list; on failure it is restored.
    pub fn finish_delete(
        &mut self,
        id: i64,
        result: Result<DeleteResponse, String>,
    ) -> Notification {
        self.deleting.retain(|&d| d != id);
        match result {
            Ok(response) => {
                self.charts.retain(|c| c.id != id);
                info!("deleted chart {} ({} left)", id, self.charts.len());
                Notification::success(
                    response
                        .message
                        .unwrap_or_else(|| "Chart deleted successfully!".to_string()),
                )
            }
            Err(message) => {
                warn!("delete of chart {} failed: {}", id, message);
                Notification::error(if message.is_empty() {
                    "Failed to delete chart".to_string()
                } else {
                    message
                })
            }
        }
    }

    /// What sharing a chart takes: copying its existing link or asking for one
    pub fn share(&self, id: i64, origin: &str) -> Option<ShareStep> {
        self.get(id).map(|chart| chart.share_step(origin))
    }

    /// Apply the service's answer to a share request
    pub fn finish_share(
        &mut self,
        id: i64,
        result: Result<ShareResponse, String>,
    ) -> Notification {
        match result {
            Ok(response) => {
                if let Some(chart) = self.charts.iter_mut().find(|c| c.id == id) {
                    chart.apply_share(&response);
                }
                info!("chart {} shared at {}", id, response.share_url);
                Notification::success("Chart is now public! Link copied to clipboard.")
            }
            Err(message) => {
                warn!("share of chart {} failed: {}", id, message);
                Notification::error(if message.is_empty() {
                    "Failed to generate share link".to_string()
                } else {
                    message
                })
            }
        }
    }
}

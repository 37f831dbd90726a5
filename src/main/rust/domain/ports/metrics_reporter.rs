use crate::domain::value_objects::SessionStatus;

/// Port for metrics reporting
pub trait MetricsReporter: Send + Sync {
    fn report_state_change(&self, status: &SessionStatus);
    fn report_chunk_sent(&self, bytes: usize);
    fn report_chunk_dropped(&self);
    fn report_frame_composited(&self);
    fn report_uptime(&self, uptime_secs: f64);
}

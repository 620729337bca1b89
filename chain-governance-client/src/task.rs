use tokio::task::JoinHandle;

/// Owner handle of a background loop.
///
/// The loop is aborted when the handle is cancelled or dropped, so a loop
/// can never outlive the component that started it.
#[derive(Debug)]
pub struct TaskHandle {
    join: JoinHandle<()>,
}

impl TaskHandle {
    pub(crate) fn new(join: JoinHandle<()>) -> Self {
        Self { join }
    }

    pub fn cancel(self) {
        self.join.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }
}

impl Drop for TaskHandle {
    fn drop(&mut self) {
        self.join.abort();
    }
}

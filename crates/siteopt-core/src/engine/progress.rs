/// Events emitted while a workflow runs.
///
/// Phases bracket the pipeline stages. Inside a phase a task may report a step
/// count in some unit: raster rows while sampling, picks during peak search,
/// iterations of k-means. A task may end before `total_steps` is reached.
#[derive(Debug, Clone, PartialEq)]
pub enum Progress {
    PhaseStart { name: &'static str },
    PhaseFinish,

    TaskStart { total_steps: u64, unit: &'static str },
    TaskIncrement,
    TaskFinish,

    Message(String),
}

pub type ProgressCallback<'a> = Box<dyn Fn(Progress) + Send + Sync + 'a>;

#[derive(Default)]
pub struct ProgressReporter<'a> {
    callback: Option<ProgressCallback<'a>>,
}

impl<'a> ProgressReporter<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_callback(callback: ProgressCallback<'a>) -> Self {
        Self {
            callback: Some(callback),
        }
    }

    #[inline]
    pub fn report(&self, event: Progress) {
        if let Some(cb) = &self.callback {
            cb(event);
        }
    }

    pub fn phase_start(&self, name: &'static str) {
        self.report(Progress::PhaseStart { name });
    }

    pub fn phase_finish(&self) {
        self.report(Progress::PhaseFinish);
    }

    pub fn message(&self, text: impl Into<String>) {
        self.report(Progress::Message(text.into()));
    }
}

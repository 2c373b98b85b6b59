/// Events emitted by long-running operations: bounded runs and minimizations.
#[derive(Debug, Clone)]
pub enum Progress {
    PhaseStart {
        name: &'static str,
        total_steps: u64,
    },
    Step {
        step: u64,
        potential_energy: f64,
        temperature: f64,
    },
    PhaseFinish {
        name: &'static str,
        steps_completed: u64,
    },

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
}

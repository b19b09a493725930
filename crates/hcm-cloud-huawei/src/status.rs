//! ECS job status values

/// Status of an asynchronous ECS job as reported by `ShowJob`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobStatus {
    Success,
    Fail,
    Running,
    Init,
    Unrecognized(String),
}

impl JobStatus {
    pub fn parse(s: &str) -> Self {
        match s {
            "SUCCESS" => JobStatus::Success,
            "FAIL" => JobStatus::Fail,
            "RUNNING" => JobStatus::Running,
            "INIT" => JobStatus::Init,
            other => JobStatus::Unrecognized(other.to_string()),
        }
    }

    /// Whether the job may still change state
    pub fn is_in_progress(&self) -> bool {
        matches!(self, JobStatus::Running | JobStatus::Init)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobStatus::Success => write!(f, "SUCCESS"),
            JobStatus::Fail => write!(f, "FAIL"),
            JobStatus::Running => write!(f, "RUNNING"),
            JobStatus::Init => write!(f, "INIT"),
            JobStatus::Unrecognized(s) => write!(f, "{s}"),
        }
    }
}

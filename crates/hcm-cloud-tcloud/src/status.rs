//! CLB asynchronous task status codes

/// Status reported by `DescribeTaskStatus`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClbTaskStatus {
    Success,
    Fail,
    Running,
    /// A code this adaptor does not know how to read
    Unrecognized(i64),
}

impl ClbTaskStatus {
    pub fn from_code(code: i64) -> Self {
        match code {
            0 => ClbTaskStatus::Success,
            1 => ClbTaskStatus::Fail,
            2 => ClbTaskStatus::Running,
            other => ClbTaskStatus::Unrecognized(other),
        }
    }

    pub fn code(&self) -> i64 {
        match self {
            ClbTaskStatus::Success => 0,
            ClbTaskStatus::Fail => 1,
            ClbTaskStatus::Running => 2,
            ClbTaskStatus::Unrecognized(code) => *code,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, ClbTaskStatus::Running)
    }
}

impl std::fmt::Display for ClbTaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClbTaskStatus::Success => write!(f, "success"),
            ClbTaskStatus::Fail => write!(f, "fail"),
            ClbTaskStatus::Running => write!(f, "running"),
            ClbTaskStatus::Unrecognized(code) => write!(f, "unrecognized({code})"),
        }
    }
}

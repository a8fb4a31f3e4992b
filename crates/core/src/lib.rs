#![forbid(unsafe_code)]

pub mod ids {
    /// Positional identifier of a job: the dense, 0-based index assigned at
    /// submission time.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
    pub struct JobId(i64);

    impl JobId {
        pub fn as_i64(self) -> i64 {
            self.0
        }

        pub fn try_new(value: i64) -> Result<Self, JobIdError> {
            if value < 0 {
                return Err(JobIdError::Negative);
            }
            Ok(Self(value))
        }
    }

    impl std::fmt::Display for JobId {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "{}", self.0)
        }
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub enum JobIdError {
        Negative,
    }

}

pub mod model {
    /// Lifecycle state of a job record.
    ///
    /// `Pending -> Running -> {Done | Running (reclaim) | Failed}`; the
    /// `Running -> Running` edge is a timeout reclaim and may repeat any
    /// number of times. `Done` and `Failed` are terminal.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub enum JobStatus {
        Pending,
        Running,
        Done,
        Failed,
    }

    impl JobStatus {
        pub fn as_str(self) -> &'static str {
            match self {
                JobStatus::Pending => "PENDING",
                JobStatus::Running => "RUNNING",
                JobStatus::Done => "DONE",
                JobStatus::Failed => "FAILED",
            }
        }

        pub fn parse(value: &str) -> Option<Self> {
            match value {
                "PENDING" => Some(JobStatus::Pending),
                "RUNNING" => Some(JobStatus::Running),
                "DONE" => Some(JobStatus::Done),
                "FAILED" => Some(JobStatus::Failed),
                _ => None,
            }
        }
    }

}

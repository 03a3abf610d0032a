//! User-visible notices
//!
//! Short toasts the host shows and then forgets. The controller queues them;
//! the host drains the queue after each call.

/// Notice severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NoticeLevel {
    #[default]
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub title: String,
    pub description: String,
}

impl Notice {
    pub fn new(level: NoticeLevel, title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            level,
            title: title.into(),
            description: description.into(),
        }
    }

    pub fn storage_full() -> Self {
        Self::new(
            NoticeLevel::Warning,
            "Storage limit reached",
            "Unable to save your code because storage is full.",
        )
    }

    pub fn cleared() -> Self {
        Self::new(
            NoticeLevel::Info,
            "Compiler cleared",
            "Your code and output have been removed.",
        )
    }

    pub fn login_required() -> Self {
        Self::new(
            NoticeLevel::Error,
            "Login required",
            "Please log in to run code.",
        )
    }

    pub fn compile_succeeded() -> Self {
        Self::new(
            NoticeLevel::Info,
            "Compilation successful!",
            "Your Java code executed successfully.",
        )
    }

    pub fn compile_failed() -> Self {
        Self::new(
            NoticeLevel::Error,
            "Compilation failed",
            "Please check your code for errors.",
        )
    }

    pub fn execution_error() -> Self {
        Self::new(
            NoticeLevel::Error,
            "Execution error",
            "An unexpected error occurred.",
        )
    }
}

impl std::fmt::Display for Notice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.title, self.description)
    }
}

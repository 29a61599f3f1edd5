//! Export Diagnostics
//!
//! [`ExportLog`] is the per-run diagnostics sink. Every message is forwarded
//! to the [`log`] facade; warnings and errors are also kept so the caller can
//! inspect them once the run is over.
//!
//! # Severity
//!
//! | Level     | Effect on the run                                          |
//! |-----------|------------------------------------------------------------|
//! | `info`    | none                                                       |
//! | `warning` | none, message collected                                    |
//! | `error`   | traversal continues, run finishes as failed                |
//! | `fatal`   | message collected, error handed back to unwind with `?`    |
//!
//! Messages carry the name of the object being exported when a context is
//! set, in the form `Obj: <name> | <message>`.

use crate::errors::ExportError;

/// Collected diagnostics of one export run.
#[derive(Debug, Default)]
pub struct ExportLog {
    errors: Vec<String>,
    warnings: Vec<String>,
    context: Option<String>,
}

impl ExportLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the object the following messages refer to.
    pub fn set_context(&mut self, object: impl Into<String>) {
        self.context = Some(object.into());
    }

    pub fn clear_context(&mut self) {
        self.context = None;
    }

    #[must_use]
    pub fn context(&self) -> Option<&str> {
        self.context.as_deref()
    }

    fn decorate(&self, msg: &str) -> String {
        match &self.context {
            Some(obj) => format!("Obj: {obj} | {msg}"),
            None => msg.to_string(),
        }
    }

    pub fn debug(&self, msg: &str) {
        log::debug!("{}", self.decorate(msg));
    }

    pub fn info(&self, msg: &str) {
        log::info!("{}", self.decorate(msg));
    }

    pub fn warning(&mut self, msg: &str) {
        let msg = self.decorate(msg);
        log::warn!("{msg}");
        self.warnings.push(msg);
    }

    /// Records a recoverable error. The run continues but will not be written.
    pub fn error(&mut self, msg: &str) {
        let msg = self.decorate(msg);
        log::error!("{msg}");
        self.errors.push(msg);
    }

    /// Records `err` and hands it back for propagation.
    ///
    /// ```rust,ignore
    /// return Err(log.fatal(ExportError::EmptyLod { level }));
    /// ```
    #[must_use]
    pub fn fatal(&mut self, err: ExportError) -> ExportError {
        let msg = self.decorate(&err.to_string());
        log::error!("{msg}");
        self.errors.push(msg);
        err
    }

    /// Records a recoverable [`ExportError`].
    pub fn record(&mut self, err: &ExportError) {
        self.error(&err.to_string());
    }

    #[inline]
    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    #[must_use]
    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    #[must_use]
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    /// Drops everything collected so far.
    pub fn reset(&mut self) {
        self.errors.clear();
        self.warnings.clear();
        self.context = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_prefixes_messages() {
        let mut log = ExportLog::new();
        log.set_context("Wing");
        log.warning("no custom distance");
        assert_eq!(log.warnings(), ["Obj: Wing | no custom distance"]);
        assert!(!log.has_errors());
    }

    #[test]
    fn fatal_records_and_returns_error() {
        let mut log = ExportLog::new();
        let err = log.fatal(ExportError::EmptyLod { level: "LOD_0_0".into() });
        assert!(matches!(err, ExportError::EmptyLod { .. }));
        assert_eq!(log.errors().len(), 1);
    }
}

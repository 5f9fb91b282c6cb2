//! Build notifications.
//!
//! Typed observer registry instead of a string-keyed event emitter: the
//! three notification kinds are separate registration points with separate
//! payload types, so the contract stays checkable by tests.

use crate::pipeline::{BuildOutput, PipelineError};
use parking_lot::Mutex;

type UpdateFn = Box<dyn Fn(&BuildOutput) + Send + Sync>;
type CompleteFn = Box<dyn Fn() + Send + Sync>;
type ErrorFn = Box<dyn Fn(&PipelineError) + Send + Sync>;

/// Registered build observers.
#[derive(Default)]
pub struct Observers {
    update: Mutex<Vec<UpdateFn>>,
    complete: Mutex<Vec<CompleteFn>>,
    error: Mutex<Vec<ErrorFn>>,
}

impl Observers {
    pub fn on_update(&self, observer: impl Fn(&BuildOutput) + Send + Sync + 'static) {
        self.update.lock().push(Box::new(observer));
    }

    pub fn on_complete(&self, observer: impl Fn() + Send + Sync + 'static) {
        self.complete.lock().push(Box::new(observer));
    }

    pub fn on_error(&self, observer: impl Fn(&PipelineError) + Send + Sync + 'static) {
        self.error.lock().push(Box::new(observer));
    }

    /// Deliver the build payload to every update observer.
    pub fn notify_update(&self, output: &BuildOutput) {
        for observer in self.update.lock().iter() {
            observer(output);
        }
    }

    pub fn notify_complete(&self) {
        for observer in self.complete.lock().iter() {
            observer();
        }
    }

    /// Deliver a failure to the error observers.
    ///
    /// Returns `false` when nobody is registered, so the caller can fall
    /// back to the default diagnostic channel.
    pub fn notify_error(&self, error: &PipelineError) -> bool {
        let observers = self.error.lock();
        if observers.is_empty() {
            return false;
        }
        for observer in observers.iter() {
            observer(error);
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_notify_update_and_complete() {
        let observers = Observers::default();
        let updates = Arc::new(AtomicUsize::new(0));
        let completes = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&updates);
        observers.on_update(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        let counter = Arc::clone(&completes);
        observers.on_complete(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let output = BuildOutput {
            html: "h".into(),
            script: "s".into(),
            stylesheet: "c".into(),
            components: Vec::new(),
            datasets: Vec::new(),
            elapsed: std::time::Duration::ZERO,
        };
        observers.notify_update(&output);
        observers.notify_complete();
        observers.notify_complete();

        assert_eq!(updates.load(Ordering::SeqCst), 1);
        assert_eq!(completes.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_notify_error_reports_registration() {
        let observers = Observers::default();
        let error = PipelineError::Resolve("x".into());
        assert!(!observers.notify_error(&error));

        let seen = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&seen);
        observers.on_error(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        assert!(observers.notify_error(&error));
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }
}

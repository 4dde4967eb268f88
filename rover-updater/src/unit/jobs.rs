use smallvec::SmallVec;
use std::fmt;

/// A step a unit performs when the drain loop visits it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Job {
    Hydrate,
    Resolve,
    Dispose,
}

impl Job {
    pub fn as_str(self) -> &'static str {
        match self {
            Job::Hydrate => "hydrate",
            Job::Resolve => "resolve",
            Job::Dispose => "dispose",
        }
    }
}

impl fmt::Display for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered job list; never holds the same job twice in a row.
#[derive(Debug, Clone, Default)]
pub struct JobQueue {
    jobs: SmallVec<[Job; 4]>,
}

impl JobQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_job(job: Job) -> Self {
        let mut queue = Self::new();
        queue.push(job);
        queue
    }

    /// Append `job` unless it is already the last entry. Returns whether it was added.
    pub fn push(&mut self, job: Job) -> bool {
        if self.jobs.last() == Some(&job) {
            return false;
        }
        self.jobs.push(job);
        true
    }

    /// Take the job at the front.
    pub fn shift(&mut self) -> Option<Job> {
        if self.jobs.is_empty() {
            None
        } else {
            Some(self.jobs.remove(0))
        }
    }

    /// Remove every queued `job`, returning whether any was present.
    pub fn remove(&mut self, job: Job) -> bool {
        let before = self.jobs.len();
        self.jobs.retain(|j| *j != job);
        // Removing from the middle can leave two equal neighbours behind.
        self.jobs.dedup();
        self.jobs.len() != before
    }

    pub fn clear(&mut self) {
        self.jobs.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn as_slice(&self) -> &[Job] {
        &self.jobs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_skips_consecutive_duplicate() {
        let mut queue = JobQueue::new();
        assert!(queue.push(Job::Resolve));
        assert!(!queue.push(Job::Resolve));
        assert!(queue.push(Job::Hydrate));
        assert!(queue.push(Job::Resolve));

        assert_eq!(queue.as_slice(), &[Job::Resolve, Job::Hydrate, Job::Resolve]);
    }

    #[test]
    fn test_shift_in_order() {
        let mut queue = JobQueue::with_job(Job::Hydrate);
        queue.push(Job::Resolve);

        assert_eq!(queue.shift(), Some(Job::Hydrate));
        assert_eq!(queue.shift(), Some(Job::Resolve));
        assert_eq!(queue.shift(), None);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_remove_keeps_invariant() {
        let mut queue = JobQueue::new();
        queue.push(Job::Resolve);
        queue.push(Job::Hydrate);
        queue.push(Job::Resolve);

        assert!(queue.remove(Job::Hydrate));
        assert_eq!(queue.as_slice(), &[Job::Resolve]);
        assert!(!queue.remove(Job::Dispose));
    }
}

use std::time::Instant;

pub fn elapsed_seconds(since: Instant) -> f64 {
    let dt = since.elapsed();
    (dt.as_secs() as f64) + (f64::from(dt.subsec_nanos()) * 1e-9)
}

pub fn prettyprint_time(seconds: f64) -> String {
    format!("{:.4}s", seconds)
}

struct TimerSpan {
    name: String,
    started_at: Instant,
}

/// Hierarchial magic. Spans are started and stopped by name and must nest properly; each one is
/// logged when it starts and when it stops, indented by depth.
pub struct Timer {
    outermost_name: String,
    stack: Vec<TimerSpan>,
    quiet: bool,
}

impl Timer {
    pub fn new<S: Into<String>>(name: S) -> Timer {
        let name = name.into();
        let mut t = Timer {
            outermost_name: name.clone(),
            stack: Vec::new(),
            quiet: false,
        };
        t.start(name);
        t
    }

    /// A timer that tracks spans, but never logs anything. Handy for tests.
    pub fn throwaway() -> Timer {
        let mut t = Timer {
            outermost_name: "throwaway".to_string(),
            stack: Vec::new(),
            quiet: true,
        };
        t.start("throwaway");
        t
    }

    fn println(&self, line: String) {
        if !self.quiet {
            info!("{}{}", "  ".repeat(self.stack.len().saturating_sub(1)), line);
        }
    }

    pub fn start<S: Into<String>>(&mut self, name: S) {
        let name = name.into();
        self.stack.push(TimerSpan {
            name: name.clone(),
            started_at: Instant::now(),
        });
        self.println(format!("{}...", name));
    }

    pub fn stop<S: AsRef<str>>(&mut self, name: S) {
        let name = name.as_ref();
        let line = match self.stack.last() {
            Some(span) => {
                assert_eq!(span.name, name, "Timer spans stopped out of order");
                format!("{} took {}", name, prettyprint_time(elapsed_seconds(span.started_at)))
            }
            None => panic!("Can't stop {}; no spans are running", name),
        };
        self.println(line);
        self.stack.pop();
    }

    pub fn note<S: Into<String>>(&mut self, line: S) {
        self.println(line.into());
    }
}

impl std::ops::Drop for Timer {
    fn drop(&mut self) {
        // If we're in the middle of unwinding a panic or an early return, don't further blow up.
        if self.stack.len() != 1 || self.stack[0].name != self.outermost_name {
            if !self.quiet {
                warn!("dropping Timer {} with unfinished spans", self.outermost_name);
            }
            return;
        }
        let name = self.outermost_name.clone();
        self.stop(name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_spans_and_notes() {
        let mut timer = Timer::throwaway();
        timer.start("load");
        timer.start("parse");
        timer.stop("parse");
        timer.note("found 3 things");
        assert_eq!(timer.stack.len(), 2);
        timer.stop("load");
        assert_eq!(timer.stack.len(), 1);
        assert_eq!(timer.stack[0].name, "throwaway");
    }

    #[test]
    #[should_panic]
    fn spans_must_nest() {
        let mut timer = Timer::throwaway();
        timer.start("a");
        timer.start("b");
        timer.stop("a");
    }
}

//! Common functionality shared by all pipeline components.

pub mod io;

use byte_unit::Byte;
use clap::Parser;
use clap_verbosity_flag::{InfoLevel, Verbosity};

/// Commonly used command line arguments.
#[derive(Parser, Debug, Clone)]
pub struct Args {
    /// Verbosity of the program.
    #[clap(flatten)]
    pub verbose: Verbosity<InfoLevel>,
}

impl Default for Args {
    fn default() -> Self {
        Self {
            verbose: Verbosity::new(0, 0),
        }
    }
}

/// Helper to print the current memory resident set size via `tracing`.
pub fn trace_rss_now() {
    let Ok(me) = procfs::process::Process::myself() else {
        return;
    };
    let page_size = procfs::page_size();
    if let Ok(stat) = me.stat() {
        tracing::debug!(
            "RSS now: {}",
            Byte::from_bytes((stat.rss * page_size) as u128).get_appropriate_unit(true)
        );
    }
}

/// Wrap a sequence string at the given column width, FASTA-style.
pub fn wrap_sequence(seq: &str, width: usize) -> String {
    let mut out = String::with_capacity(seq.len() + seq.len() / width + 1);
    for (i, chunk) in seq.as_bytes().chunks(width).enumerate() {
        if i > 0 {
            out.push('\n');
        }
        out.push_str(std::str::from_utf8(chunk).expect("sequence must be ASCII/UTF-8"));
    }
    out
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn wrap_sequence_short() {
        assert_eq!(wrap_sequence("ACGT", 60), "ACGT");
    }

    #[test]
    fn wrap_sequence_wraps_at_width() {
        let seq = "A".repeat(130);
        let wrapped = wrap_sequence(&seq, 60);
        let lines: Vec<&str> = wrapped.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0].len(), 60);
        assert_eq!(lines[1].len(), 60);
        assert_eq!(lines[2].len(), 10);
    }
}

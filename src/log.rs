//! Console logging shared by every node process.
//!
//! Lines go to stderr so that delivered payloads on stdout stay readable.
//! Once a process knows its ring position it calls [`set_node`] and every
//! following line is tagged with it.

use color_print::cformat;
use std::{
    io::Write,
    sync::{
        atomic::{AtomicBool, Ordering},
        OnceLock,
    },
};

static VERBOSE: AtomicBool = AtomicBool::new(false);
static NODE: OnceLock<u32> = OnceLock::new();

/// Function that enables or disables debug lines.
pub fn set_verbose(verbose: bool) {
    VERBOSE.store(verbose, Ordering::Relaxed);
}

/// Function that tags every following line of this process with its ring position.
pub fn set_node(index: u32) {
    let _ = NODE.set(index);
}

/// Every node shares stderr, so a line is written in one piece.
fn emit(level: String, msg: &str) {
    let origin = match NODE.get() {
        Some(index) => cformat!("<dim>[node {index}]</dim> "),
        None => String::new(),
    };
    let line = format!("{level} {origin}{msg}\n");
    let _ = std::io::stderr().lock().write_all(line.as_bytes());
}

pub fn debug(msg: &str) {
    if VERBOSE.load(Ordering::Relaxed) {
        emit(cformat!("<blue, bold>debug</blue, bold>"), msg);
    }
}

pub fn info(msg: &str) {
    emit(cformat!("<green, bold>info</green, bold> "), msg);
}

pub fn warn(msg: &str) {
    emit(cformat!("<yellow, bold>warn</yellow, bold> "), msg);
}

pub fn error(msg: &str) {
    emit(cformat!("<red, bold>error</red, bold>"), msg);
}

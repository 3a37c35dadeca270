/*!
 * Built-in Catalogue
 * Program templates and a plain-process workload for demos and tests
 */

use super::types::{ProcessRequest, ProcessTemplate};
use crate::core::limits::KIB;
use crate::core::types::Size;

/// Section sizes are scaled up so programs occupy a visible share of 16 MiB
const SCALE: Size = 6;

/// Every program shares the same stack reserve
const COMMON_STACK: Size = 64 * KIB;

const COMMON_HEAP: Size = 128 * KIB;

fn program(name: &str, text: Size, data: Size, bss: Size) -> ProcessTemplate {
    ProcessTemplate::new(name)
        .with_segment(".text", text * SCALE)
        .with_segment(".data", data * SCALE)
        .with_segment(".bss", bss * SCALE)
        .with_segment(".stack", COMMON_STACK)
        .with_segment(".heap", COMMON_HEAP * SCALE)
}

/// Five office programs, roughly 0.9 to 2.2 MiB each
pub fn builtin_templates() -> Vec<ProcessTemplate> {
    vec![
        program("p1 (notepad)", 19_524, 12_352, 1_165),
        program("p2 (word)", 77_539, 32_680, 4_100),
        program("p3 (excel)", 99_542, 24_245, 7_557),
        program("p4 (powerpoint)", 115_000, 123_470, 1_123),
        program("p5 (publisher)", 12_342, 1_256, 1_756),
    ]
}

/// Plain processes for the static and dynamic disciplines
pub fn builtin_workload() -> Vec<ProcessRequest> {
    [
        ("web browser", 780),
        ("code editor", 1200),
        ("music player", 450),
        ("terminal", 256),
        ("light game", 2100),
    ]
    .into_iter()
    .map(|(name, kib)| ProcessRequest::plain(name, kib * KIB))
    .collect()
}

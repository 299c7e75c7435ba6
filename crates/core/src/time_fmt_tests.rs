// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[yare::parameterized(
    millis  = { 420, "420ms" },
    seconds = { 3_200, "3.2s" },
    minutes = { 125_000, "2m05s" },
    hours   = { 4_320_000, "1h12m" },
)]
fn formats_compactly(ms: u64, expected: &str) {
    assert_eq!(format_elapsed_ms(ms), expected);
}

// src/boxes/ports.rs

//! Default port layout of every box type.
//!
//! The table is plain constant data keyed by the box-type tag used in
//! pipeline files.

use self::names::*;
use crate::variables::VariableType;
use crate::variables::VariableType::{File, FileArray, String as Str, StringArray};

/// Port names shared by several box types.
pub mod names {
    pub const INPUT: &str = "input";
    pub const IN_DATA: &str = "in-data";
    pub const OUT_DATA: &str = "out-data";

    pub const BINARY_FILE: &str = "binary-file";
    pub const ARGS: &str = "args";
    pub const STDIN: &str = "stdin";
    pub const INPUT_FILES: &str = "input-files";
    pub const STDOUT: &str = "stdout";
    pub const OUTPUT_FILE: &str = "output-file";

    pub const SOURCE_FILES: &str = "source-files";
    pub const EXTRA_FILES: &str = "extra-files";

    pub const EXPECTED_OUTPUT: &str = "expected-output";
    pub const ACTUAL_OUTPUT: &str = "actual-output";

    pub const IN1: &str = "in1";
    pub const IN2: &str = "in2";
    pub const IN: &str = "in";
    pub const OUT: &str = "out";
}

/// Static description of one port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortSpec {
    pub name: &'static str,
    pub ty: VariableType,
    pub required: bool,
}

/// Category a box type belongs to; decides how it compiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoxCategory {
    DataIn,
    DataOut,
    Execution,
    Compilation,
    Judge,
    Merge,
    ScalarToArray,
}

/// Static description of a box type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoxTypeSpec {
    pub tag: &'static str,
    pub category: BoxCategory,
    pub inputs: &'static [PortSpec],
    pub outputs: &'static [PortSpec],
}

const fn req(name: &'static str, ty: VariableType) -> PortSpec {
    PortSpec {
        name,
        ty,
        required: true,
    }
}

const fn opt(name: &'static str, ty: VariableType) -> PortSpec {
    PortSpec {
        name,
        ty,
        required: false,
    }
}

pub static BOX_TYPES: &[BoxTypeSpec] = &[
    BoxTypeSpec {
        tag: "file-in",
        category: BoxCategory::DataIn,
        inputs: &[req(INPUT, File)],
        outputs: &[req(IN_DATA, File)],
    },
    BoxTypeSpec {
        tag: "files-in",
        category: BoxCategory::DataIn,
        inputs: &[req(INPUT, FileArray)],
        outputs: &[req(IN_DATA, FileArray)],
    },
    BoxTypeSpec {
        tag: "string-in",
        category: BoxCategory::DataIn,
        inputs: &[req(INPUT, Str)],
        outputs: &[req(IN_DATA, Str)],
    },
    BoxTypeSpec {
        tag: "strings-in",
        category: BoxCategory::DataIn,
        inputs: &[req(INPUT, StringArray)],
        outputs: &[req(IN_DATA, StringArray)],
    },
    BoxTypeSpec {
        tag: "file-out",
        category: BoxCategory::DataOut,
        inputs: &[req(OUT_DATA, File)],
        outputs: &[],
    },
    BoxTypeSpec {
        tag: "files-out",
        category: BoxCategory::DataOut,
        inputs: &[req(OUT_DATA, FileArray)],
        outputs: &[],
    },
    BoxTypeSpec {
        tag: "execution",
        category: BoxCategory::Execution,
        inputs: &[
            opt(BINARY_FILE, File),
            opt(ARGS, StringArray),
            opt(STDIN, File),
            opt(INPUT_FILES, FileArray),
        ],
        outputs: &[opt(STDOUT, File), opt(OUTPUT_FILE, File)],
    },
    BoxTypeSpec {
        tag: "compilation",
        category: BoxCategory::Compilation,
        inputs: &[
            req(SOURCE_FILES, FileArray),
            opt(EXTRA_FILES, FileArray),
            opt(ARGS, StringArray),
        ],
        outputs: &[opt(BINARY_FILE, File)],
    },
    BoxTypeSpec {
        tag: "judge",
        category: BoxCategory::Judge,
        inputs: &[
            req(EXPECTED_OUTPUT, File),
            req(ACTUAL_OUTPUT, File),
            opt(ARGS, StringArray),
        ],
        outputs: &[],
    },
    BoxTypeSpec {
        tag: "merge-files",
        category: BoxCategory::Merge,
        inputs: &[req(IN1, FileArray), req(IN2, FileArray)],
        outputs: &[req(OUT, FileArray)],
    },
    BoxTypeSpec {
        tag: "merge-strings",
        category: BoxCategory::Merge,
        inputs: &[req(IN1, StringArray), req(IN2, StringArray)],
        outputs: &[req(OUT, StringArray)],
    },
    BoxTypeSpec {
        tag: "file-to-array",
        category: BoxCategory::ScalarToArray,
        inputs: &[req(IN, File)],
        outputs: &[req(OUT, FileArray)],
    },
    BoxTypeSpec {
        tag: "string-to-array",
        category: BoxCategory::ScalarToArray,
        inputs: &[req(IN, Str)],
        outputs: &[req(OUT, StringArray)],
    },
];

/// Look up a box type by tag.
pub fn box_type(tag: &str) -> Option<&'static BoxTypeSpec> {
    BOX_TYPES.iter().find(|spec| spec.tag == tag)
}

mod compile;

pub use compile::{
    buildpack_root, compile, CompileReport, CompileRequest, Compiler, Stage,
};

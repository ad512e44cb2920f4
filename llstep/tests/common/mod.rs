//! Common test utilities and macros

use llstep::interpreter::Machine;
use llstep::runner::run_to_completion;
use llstep::value::Value;
use std::path::Path;

#[derive(Debug)]
pub enum TestResult {
    SuccessWithValue(Option<Value>),
    Output(Vec<String>),
    Error(String),
    ErrorRegex(String),
}

impl PartialEq for TestResult {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (TestResult::SuccessWithValue(a), TestResult::SuccessWithValue(b)) => a == b,
            (TestResult::Output(a), TestResult::Output(b)) => a == b,
            (TestResult::Error(a), TestResult::Error(b)) => a == b,
            (TestResult::ErrorRegex(pattern), TestResult::Error(msg)) => {
                regex::Regex::new(pattern).unwrap().is_match(msg)
            }
            (TestResult::Error(msg), TestResult::ErrorRegex(pattern)) => {
                regex::Regex::new(pattern).unwrap().is_match(msg)
            }
            _ => false,
        }
    }
}

pub fn input_path(input_file: &str) -> std::path::PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("inputs")
        .join(input_file)
}

/// Runs `entry` of the program in `input_file` and returns its result.
pub fn run_program_test(input_file: &Path, entry: &str, args: &[i64]) -> TestResult {
    let program = match llstep::load_program(input_file) {
        Ok(program) => program,
        Err(e) => return TestResult::Error(format!("{e:#}")),
    };
    match llstep::run_function(&program, entry, args) {
        Ok(value) => TestResult::SuccessWithValue(value),
        Err(e) => TestResult::Error(format!("{e:#}")),
    }
}

/// Runs `entry` of the program in `input_file` and returns what it printed.
pub fn run_output_test(input_file: &Path, entry: &str) -> TestResult {
    let program = match llstep::load_program(input_file) {
        Ok(program) => program,
        Err(e) => return TestResult::Error(format!("{e:#}")),
    };
    let mut machine = match Machine::new(&program, entry, &[]) {
        Ok(machine) => machine,
        Err(e) => return TestResult::Error(e.to_string()),
    };
    match run_to_completion(&mut machine) {
        Ok(_) => TestResult::Output(machine.take_output()),
        Err(e) => TestResult::Error(e.to_string()),
    }
}

#[macro_export]
macro_rules! check_program {
    ($test_name:ident, input=$input_file:expr, entry=$entry:expr, args=[$($arg:expr),* $(,)?], result=$expected:expr) => {
        #[test]
        fn $test_name() {
            let input_path = crate::common::input_path($input_file);
            let result = crate::common::run_program_test(&input_path, $entry, &[$($arg),*]);
            assert_eq!(result, $expected);
        }
    };
}

#[macro_export]
macro_rules! check_output {
    ($test_name:ident, input=$input_file:expr, entry=$entry:expr, output=[$($line:expr),* $(,)?]) => {
        #[test]
        fn $test_name() {
            let input_path = crate::common::input_path($input_file);
            let result = crate::common::run_output_test(&input_path, $entry);
            assert_eq!(
                result,
                crate::common::TestResult::Output(vec![$($line.to_string()),*])
            );
        }
    };
}

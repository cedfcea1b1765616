use anyhow::{anyhow, Context, Result};
use glob::glob;
use std::result::Result as StdResult;

use std::fs;
use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};

const INTERPRETER: &str = "../target/release/puncta";

fn main() -> Result<()> {
    compile_puncta().context("compiling interpreter")?;

    let scripts: Vec<_> = glob("tests/*.pun")?.collect::<StdResult<_, _>>()?;
    let mut failed = 0;
    for script in &scripts {
        if run_script(script)? {
            println!("{}: passed", script.display());
        } else {
            failed += 1;
        }
    }
    println!("{} of {} scripts passed", scripts.len() - failed, scripts.len());
    if failed > 0 {
        std::process::exit(1);
    }
    Ok(())
}

/// Runs `script`, feeding it `<name>.in` if that exists, and compares stdout to `<name>.out`
fn run_script(script: &Path) -> Result<bool> {
    let expected_path = script.with_extension("out");
    let expected_output = fs::read_to_string(&expected_path)
        .context(format!("loading expected output: {}", expected_path.display()))?;
    let input = fs::read(script.with_extension("in")).unwrap_or_default();

    let mut child = Command::new(INTERPRETER)
        .arg(script)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .context(format!("running script {}", script.display()))?;
    if let Some(mut stdin) = child.stdin.take() {
        stdin.write_all(&input)?;
    }
    let output = child.wait_with_output()?;
    let stdout = String::from_utf8(output.stdout)?;

    if output.status.success() && stdout == expected_output {
        Ok(true)
    } else {
        println!(
            "{}: failed ({})\nactual output:\n{}\nstderr:\n{}",
            script.display(),
            output.status,
            stdout,
            String::from_utf8_lossy(&output.stderr)
        );
        Ok(false)
    }
}

fn compile_puncta() -> Result<()> {
    let st = Command::new("cargo")
        .args(["build", "--release", "-p", "puncta"])
        .status()?;
    if st.success() {
        Ok(())
    } else {
        Err(anyhow!("compiling the interpreter failed"))
    }
}

use std::io::{Stdout, Write};

use anyhow::{anyhow, bail, Result};
use crossterm::{self as ct, terminal};
use puncta_lib::core::Program;
use puncta_lib::vm::{Executor, StepOutcome};
use rustyline::{error::ReadlineError, DefaultEditor};

#[derive(PartialEq, Clone)]
enum UserCommand {
    Next,
    Continue,
    LastCommand,
    ShowVars,
    ShowLabels,
    ShowActions,
    ShowVar(String),
    Quit,
}

/// Steps through the program. The labels must have been checked already
pub fn run(exec: &mut Executor, src: &str, stdout: &mut Stdout) -> Result<()> {
    let mut rl = DefaultEditor::new()?;
    let mut last_cmd: Option<UserCommand> = None;

    use UserCommand::*;
    loop {
        render_state(stdout, exec, src)?;
        stdout.flush()?;
        if exec.is_halted() {
            println!("program halted after {} steps", exec.steps());
        }
        let mut cmd = read_line(&mut rl)?;
        if cmd == LastCommand {
            if let Some(last) = &last_cmd {
                cmd = last.clone();
            }
        }
        match &cmd {
            LastCommand => {
                // only reached if there was no last command, in which case it's a noop
            }
            Next => {
                if exec.step()? == StepOutcome::Halted {
                    println!("program halted after {} steps", exec.steps());
                }
            }
            Continue => {
                while exec.step()? == StepOutcome::Continue {}
                println!("program halted after {} steps", exec.steps());
            }
            ShowVars => {
                let mut vars: Vec<_> = exec.variables().iter().collect();
                vars.sort_by(|a, b| a.0.cmp(b.0));
                for (name, value) in vars {
                    println!("{} = {:?}", name, value);
                }
            }
            ShowLabels => {
                for (name, idx) in exec.program().sorted_labels() {
                    println!("{}: {}", name, idx);
                }
            }
            ShowActions => println!("{}", exec.actions().names().join(" ")),
            ShowVar(name) => match exec.get(name) {
                Some(value) => println!("{} = {:?}", name, value),
                None => println!("no variable named {}", name),
            },
            Quit => return Ok(()),
        }
        last_cmd = Some(cmd);
    }
}

fn read_line(rl: &mut DefaultEditor) -> Result<UserCommand> {
    loop {
        let line = rl.readline("> ");
        use ReadlineError::*;
        match line {
            Ok(line) => match parse_line(&line) {
                Ok(cmd) => return Ok(cmd),
                Err(e) => eprintln!("Error: {}", e),
            },
            Err(Interrupted | Eof) => return Ok(UserCommand::Quit),
            Err(other) => return Err(other.into()),
        }
    }
}

fn parse_line(line: &str) -> Result<UserCommand> {
    use UserCommand::*;
    let elems: Vec<_> = line.split_whitespace().collect();
    match elems.as_slice() {
        [] => Ok(LastCommand),
        ["n" | "next"] => Ok(Next),
        ["c" | "continue"] => Ok(Continue),
        ["q" | "quit"] => Ok(Quit),
        ["s" | "show", rest @ ..] => parse_show(rest),
        _ => Err(anyhow!("Invalid Command")),
    }
}

fn parse_show(elems: &[&str]) -> Result<UserCommand> {
    match elems {
        [] => bail!("show needs an argument"),
        ["vars"] => Ok(UserCommand::ShowVars),
        ["labels"] => Ok(UserCommand::ShowLabels),
        ["actions"] => Ok(UserCommand::ShowActions),
        ["var", name] => Ok(UserCommand::ShowVar(name.to_string())),
        _ => bail!("Invalid word after show"),
    }
}

struct Rect {
    w: u16,
    h: u16,
    x: u16,
    y: u16,
}

struct Rects {
    src: Rect,
    code: Rect,
    vars: Rect,
    labels: Rect,
}

impl Rect {
    pub fn render(
        &self,
        stdout: &mut Stdout,
        lines: impl IntoIterator<Item = String>,
    ) -> Result<()> {
        let wu = self.w as usize;
        let mut lines = lines.into_iter();
        for i in 0..self.h {
            let line = lines.next().unwrap_or_default();
            ct::queue!(stdout, ct::cursor::MoveTo(self.x, self.y + i))?;
            let line: String = line.chars().take(wu).collect();
            let pad = wu - line.chars().count();
            write!(stdout, "{}{}", line, " ".repeat(pad))?;
        }
        Ok(())
    }
}

fn render_state(stdout: &mut Stdout, exec: &Executor, src: &str) -> Result<()> {
    let curr_cursor = ct::cursor::position()?;
    let rects = compute_rects(terminal::size()?);
    render_src(stdout, &rects.src, src, exec.current_line())?;
    render_code(stdout, &rects.code, exec.program(), exec.pc())?;
    render_vars(stdout, &rects.vars, exec)?;
    render_labels(stdout, &rects.labels, exec.program())?;
    ct::queue!(stdout, ct::cursor::MoveTo(curr_cursor.0, curr_cursor.1))?;
    Ok(())
}

/// marks the line of the next instruction with `>`
fn render_src(stdout: &mut Stdout, rect: &Rect, src: &str, line: Option<usize>) -> Result<()> {
    let line = line.unwrap_or(0);
    let skip = line.saturating_sub(rect.h as usize / 2 + 1);
    let lines = src.lines().enumerate().skip(skip).map(|(i, text)| {
        let marker = if i + 1 == line { '>' } else { ' ' };
        format!("{}{:>4} {}", marker, i + 1, text)
    });
    rect.render(stdout, lines)
}

fn render_code(stdout: &mut Stdout, rect: &Rect, program: &Program, pc: usize) -> Result<()> {
    let lines = std::iter::once("Instructions:".to_string()).chain(
        program
            .text
            .iter()
            .enumerate()
            .skip(pc)
            .map(|(i, inst)| format!("{}: {}", i, inst)),
    );
    rect.render(stdout, lines)
}

fn render_vars(stdout: &mut Stdout, rect: &Rect, exec: &Executor) -> Result<()> {
    let mut vars: Vec<_> = exec.variables().iter().collect();
    vars.sort_by(|a, b| a.0.cmp(b.0));
    let lines = std::iter::once("Variables:".to_string())
        .chain(vars.into_iter().map(|(name, v)| format!("{} = {}", name, v)));
    rect.render(stdout, lines)
}

fn render_labels(stdout: &mut Stdout, rect: &Rect, program: &Program) -> Result<()> {
    let lines = std::iter::once("Labels:".to_string()).chain(
        program
            .sorted_labels()
            .into_iter()
            .map(|(name, idx)| format!("{}: {}", idx, name)),
    );
    rect.render(stdout, lines)
}

fn compute_rects((term_w, term_h): (u16, u16)) -> Rects {
    let width14 = term_w / 4;
    let width12 = term_w / 2;
    let width34 = term_w * 3 / 4;
    let height45 = term_h * 4 / 5;
    let height25 = term_h * 2 / 5;

    Rects {
        src: Rect {
            x: 0,
            y: 0,
            w: width12,
            h: height45,
        },
        code: Rect {
            x: width12,
            y: 0,
            w: width14,
            h: height45,
        },
        vars: Rect {
            x: width34,
            y: 0,
            w: width14,
            h: height25,
        },
        labels: Rect {
            x: width34,
            y: height25,
            w: width14,
            h: height45 - height25,
        },
    }
}

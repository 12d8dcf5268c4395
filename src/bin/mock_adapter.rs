//! Mock DAP adapter binary for integration testing
//!
//! Imitates lldb-dap debugging the asserting helper: the program prints its
//! greeting, fails the assertion in `main` and stops with SIGABRT. Textual
//! commands sent through `evaluate` in the repl context answer the way lldb
//! prints them.
//!
//! Flags:
//!   --truncated-backtrace  unwinding stops at `__assert_fail`, so `main` is missing
//!   --no-abort             the program exits normally instead of asserting
//!   --hang-on-initialize   never answers `initialize`
//!   --hang-after-configuration-done
//!                          the program starts but never stops or exits
//!   --no-pc-marker         `disassemble` output lacks the `->` current-pc marker
//!   --misaligned-disassembly
//!                          the disassemble request starts one byte past the address

use serde_json::{json, Value};
use std::io::{BufRead, BufReader, Read, Write};
use std::path::{Path, PathBuf};

const PID: i64 = 4242;
const THREAD_ID: i64 = 4242;
const FRAME_ID_BASE: i64 = 1000;
const ASSERT_MARKER: &str = "// Assert here.";
const MAIN_PC: u64 = 0x5555_5555_5180;
const LIBC_BASE: u64 = 0x7fff_f7a8_b000;
const HELLO_ADDR: u64 = 0x5555_5555_6004;
const ARGV_ADDR: u64 = 0x7fff_ffff_e3a8;

fn main() {
    let args: Vec<String> = std::env::args().collect();
    let mut state = MockState {
        truncated_backtrace: args.iter().any(|a| a == "--truncated-backtrace"),
        no_abort: args.iter().any(|a| a == "--no-abort"),
        hang_on_initialize: args.iter().any(|a| a == "--hang-on-initialize"),
        hang_after_configuration_done: args
            .iter()
            .any(|a| a == "--hang-after-configuration-done"),
        no_pc_marker: args.iter().any(|a| a == "--no-pc-marker"),
        misaligned_disassembly: args.iter().any(|a| a == "--misaligned-disassembly"),
        ..Default::default()
    };

    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    let mut reader = BufReader::new(stdin.lock());
    let mut writer = stdout.lock();

    loop {
        // Read Content-Length header
        let mut header_line = String::new();
        if reader.read_line(&mut header_line).unwrap_or(0) == 0 {
            break; // EOF
        }

        if !header_line.starts_with("Content-Length:") {
            continue;
        }

        let content_length: usize = header_line
            .trim_start_matches("Content-Length:")
            .trim()
            .parse()
            .unwrap_or(0);

        // Read empty line
        let mut empty_line = String::new();
        reader.read_line(&mut empty_line).ok();

        let mut body = vec![0u8; content_length];
        if reader.read_exact(&mut body).is_err() {
            break;
        }

        let message: Value = match serde_json::from_slice(&body) {
            Ok(v) => v,
            Err(_) => continue,
        };

        if let Some(responses) = state.process_message(&message) {
            for response in responses {
                send_message(&mut writer, &response);
            }
        }

        if state.disconnected {
            break;
        }
    }
}

fn send_message<W: Write>(writer: &mut W, message: &Value) {
    let body = message.to_string();
    let header = format!("Content-Length: {}\r\n\r\n", body.len());
    writer.write_all(header.as_bytes()).ok();
    writer.write_all(body.as_bytes()).ok();
    writer.flush().ok();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum Stop {
    #[default]
    NotStarted,
    Breakpoint,
    Abort,
    Exited,
}

/// One frame of the simulated backtrace
struct MockFrame {
    function: &'static str,
    module: &'static str,
    pc: u64,
    offset: u64,
    in_main: bool,
}

#[derive(Default)]
struct MockState {
    seq: i64,
    truncated_backtrace: bool,
    no_abort: bool,
    hang_on_initialize: bool,
    hang_after_configuration_done: bool,
    no_pc_marker: bool,
    misaligned_disassembly: bool,
    disconnected: bool,
    program: Option<String>,
    source: Option<PathBuf>,
    assert_line: u32,
    breakpoint_lines: Vec<u32>,
    stop: Stop,
    selected_frame: usize,
    expression_count: u32,
}

impl MockState {
    fn next_seq(&mut self) -> i64 {
        self.seq += 1;
        self.seq
    }

    fn event(&mut self, event: &str, body: Value) -> Value {
        json!({
            "seq": self.next_seq(),
            "type": "event",
            "event": event,
            "body": body
        })
    }

    fn frames(&self) -> Vec<MockFrame> {
        let libc = |function, index: u64, offset| MockFrame {
            function,
            module: "libc.so.6",
            pc: LIBC_BASE + index * 0x1000 + offset,
            offset,
            in_main: false,
        };
        let main = MockFrame {
            function: "main",
            module: "a.out",
            pc: MAIN_PC,
            offset: 0x30,
            in_main: true,
        };

        match self.stop {
            Stop::Breakpoint => vec![main, libc("__libc_start_call_main", 6, 0x7a)],
            Stop::Abort => {
                let mut frames = vec![
                    libc("__pthread_kill_implementation", 0, 0x2c),
                    libc("raise", 1, 0x16),
                    libc("abort", 2, 0xd3),
                    libc("__assert_fail_base", 3, 0x71),
                    libc("__assert_fail", 4, 0x42),
                ];
                if !self.truncated_backtrace {
                    frames.push(main);
                    frames.push(libc("__libc_start_call_main", 6, 0x7a));
                }
                frames
            }
            Stop::NotStarted | Stop::Exited => Vec::new(),
        }
    }

    fn source_name(&self) -> String {
        self.source
            .as_deref()
            .and_then(Path::file_name)
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "main.c".to_string())
    }

    fn describe_frame(&self, frame: &MockFrame) -> String {
        if frame.in_main {
            format!(
                "0x{:016x} {}`main(argc=1, argv=0x{:016x}) at {}:{}:5",
                frame.pc,
                frame.module,
                ARGV_ADDR,
                self.source_name(),
                self.assert_line
            )
        } else {
            format!(
                "0x{:016x} {}`{} + {}",
                frame.pc, frame.module, frame.function, frame.offset
            )
        }
    }

    fn stop_description(&self) -> &'static str {
        match self.stop {
            Stop::Breakpoint => "breakpoint 1.1",
            _ => "signal SIGABRT",
        }
    }

    fn process_message(&mut self, message: &Value) -> Option<Vec<Value>> {
        let msg_type = message.get("type")?.as_str()?;

        if msg_type != "request" {
            return None;
        }

        let command = message.get("command")?.as_str()?.to_string();
        let request_seq = message.get("seq")?.as_i64()?;
        let arguments = message.get("arguments").cloned().unwrap_or(json!({}));

        if command == "initialize" && self.hang_on_initialize {
            return None;
        }

        let seq = self.next_seq();
        let mut events = Vec::new();

        let (success, body) = match command.as_str() {
            "initialize" => (
                true,
                json!({
                    "supportsConfigurationDoneRequest": true,
                    "supportsDisassembleRequest": true
                }),
            ),
            "launch" => {
                let program = arguments
                    .get("program")
                    .and_then(|v| v.as_str())
                    .map(String::from);
                self.source = program
                    .as_deref()
                    .map(|p| Path::new(p).with_file_name("main.c"));
                self.assert_line = self
                    .source
                    .as_deref()
                    .and_then(|s| std::fs::read_to_string(s).ok())
                    .and_then(|content| {
                        content
                            .lines()
                            .position(|l| l.contains(ASSERT_MARKER))
                            .map(|i| i as u32 + 1)
                    })
                    .unwrap_or(0);
                self.program = program;

                let initialized = self.event("initialized", json!({}));
                events.push(initialized);
                (true, json!(null))
            }
            "setBreakpoints" => {
                let lines: Vec<u32> = arguments
                    .get("breakpoints")
                    .and_then(|b| b.as_array())
                    .map(|bps| {
                        bps.iter()
                            .filter_map(|bp| bp.get("line").and_then(|l| l.as_u64()))
                            .map(|l| l as u32)
                            .collect()
                    })
                    .unwrap_or_default();

                let breakpoints: Vec<Value> = lines
                    .iter()
                    .enumerate()
                    .map(|(i, &line)| {
                        if line == self.assert_line {
                            json!({ "id": i + 1, "verified": true, "line": line })
                        } else {
                            json!({
                                "id": i + 1,
                                "verified": false,
                                "message": "No locations found"
                            })
                        }
                    })
                    .collect();

                self.breakpoint_lines = lines
                    .into_iter()
                    .filter(|&l| l == self.assert_line)
                    .collect();
                (true, json!({ "breakpoints": breakpoints }))
            }
            "configurationDone" => {
                let greeting = self.event(
                    "output",
                    json!({ "category": "stdout", "output": "Hello, assertion!\n" }),
                );
                events.push(greeting);

                if self.hang_after_configuration_done {
                    // Running, with nothing more to report
                } else if self.no_abort {
                    self.exit(0, &mut events);
                } else if self.breakpoint_lines.contains(&self.assert_line) {
                    self.stop_at(Stop::Breakpoint, &mut events);
                } else {
                    self.stop_at(Stop::Abort, &mut events);
                }
                (true, json!(null))
            }
            "next" | "continue" => match self.stop {
                Stop::Breakpoint => {
                    self.stop_at(Stop::Abort, &mut events);
                    (true, json!({ "allThreadsContinued": true }))
                }
                Stop::Abort => {
                    self.exit(134, &mut events);
                    (true, json!({ "allThreadsContinued": true }))
                }
                _ => (false, json!({ "error": { "id": 1, "format": "process is not stopped" } })),
            },
            "threads" => (
                true,
                json!({ "threads": [ { "id": THREAD_ID, "name": "a.out" } ] }),
            ),
            "stackTrace" => {
                let frames: Vec<Value> = self
                    .frames()
                    .iter()
                    .enumerate()
                    .map(|(i, frame)| {
                        let mut value = json!({
                            "id": FRAME_ID_BASE + i as i64,
                            "name": frame.function,
                            "line": 0,
                            "column": 0,
                            "instructionPointerReference": format!("0x{:x}", frame.pc)
                        });
                        if frame.in_main {
                            value["source"] = json!({
                                "name": self.source_name(),
                                "path": self.source.as_ref().map(|p| p.display().to_string())
                            });
                            value["line"] = json!(self.assert_line);
                            value["column"] = json!(5);
                        }
                        value
                    })
                    .collect();
                let total = frames.len();
                (true, json!({ "stackFrames": frames, "totalFrames": total }))
            }
            "evaluate" => {
                if let Some(frame_id) = arguments.get("frameId").and_then(|f| f.as_i64()) {
                    let index = (frame_id - FRAME_ID_BASE).max(0) as usize;
                    if index < self.frames().len() {
                        self.selected_frame = index;
                    }
                }
                let expression = arguments
                    .get("expression")
                    .and_then(|e| e.as_str())
                    .unwrap_or("");
                let result = match expression.strip_prefix('`') {
                    Some(cmd) => self.run_command(cmd.trim()),
                    None => self.evaluate(expression.trim()),
                };
                (true, json!({ "result": result, "variablesReference": 0 }))
            }
            "disassemble" => {
                let start = arguments
                    .get("memoryReference")
                    .and_then(|m| m.as_str())
                    .and_then(|m| u64::from_str_radix(m.trim_start_matches("0x"), 16).ok())
                    .unwrap_or(0);
                let count = arguments
                    .get("instructionCount")
                    .and_then(|c| c.as_u64())
                    .unwrap_or(1);
                let first = if self.misaligned_disassembly {
                    start + 1
                } else {
                    start
                };
                let symbol = self
                    .frames()
                    .iter()
                    .find(|f| f.pc == start)
                    .map(|f| f.function)
                    .unwrap_or("??");

                let instructions: Vec<Value> = (0..count)
                    .map(|i| {
                        json!({
                            "address": format!("0x{:x}", first + i * 4),
                            "instruction": "movl   %eax, %r12d",
                            "symbol": symbol
                        })
                    })
                    .collect();
                (true, json!({ "instructions": instructions }))
            }
            "disconnect" => {
                self.disconnected = true;
                (true, json!(null))
            }
            _ => (
                false,
                json!({ "error": { "id": 2, "format": format!("Unknown command: {}", command) } }),
            ),
        };

        let message = body["error"]["format"].clone();
        let mut response = json!({
            "seq": seq,
            "type": "response",
            "request_seq": request_seq,
            "success": success,
            "command": command,
            "body": body
        });
        if !success {
            response["message"] = message;
        }
        let mut responses = vec![response];
        responses.extend(events);
        Some(responses)
    }

    fn stop_at(&mut self, stop: Stop, events: &mut Vec<Value>) {
        self.stop = stop;
        self.selected_frame = 0;

        let body = match stop {
            Stop::Breakpoint => json!({
                "reason": "breakpoint",
                "description": "breakpoint 1.1",
                "threadId": THREAD_ID,
                "allThreadsStopped": true,
                "hitBreakpointIds": [1]
            }),
            _ => {
                let message = format!(
                    "a.out: {}:{}: main: Assertion `null_ptr' failed.\n",
                    self.source_name(),
                    self.assert_line
                );
                let stderr =
                    self.event("output", json!({ "category": "stderr", "output": message }));
                events.push(stderr);
                json!({
                    "reason": "exception",
                    "description": "signal SIGABRT",
                    "threadId": THREAD_ID,
                    "allThreadsStopped": true
                })
            }
        };
        let stopped = self.event("stopped", body);
        events.push(stopped);
    }

    fn exit(&mut self, code: i32, events: &mut Vec<Value>) {
        self.stop = Stop::Exited;
        let exited = self.event("exited", json!({ "exitCode": code }));
        events.push(exited);
        let terminated = self.event("terminated", json!({}));
        events.push(terminated);
    }

    /// Answer a textual command the way lldb prints it
    fn run_command(&mut self, command: &str) -> String {
        if matches!(self.stop, Stop::NotStarted | Stop::Exited) {
            return "error: Command requires a process which is currently stopped.".to_string();
        }

        let mut words = command.split_whitespace();
        match (words.next(), words.next()) {
            (Some("thread"), Some("list")) => self.thread_list(),
            (Some("thread"), Some("backtrace")) => self.backtrace(),
            (Some("register"), Some("read")) => match words.next() {
                Some(name) if is_register(name) => {
                    format!("{:>8} = 0x{:016x}\n", name, register_value(name))
                }
                Some(name) => format!("error: Invalid register name '{}'.", name),
                None => "error: register read requires a register name".to_string(),
            },
            (Some("frame"), Some("select")) => {
                let index = words.next().and_then(|w| w.parse::<usize>().ok());
                let frames = self.frames();
                match index {
                    Some(i) if i < frames.len() => {
                        self.selected_frame = i;
                        format!("frame #{}: {}", i, self.describe_frame(&frames[i]))
                    }
                    Some(i) => format!("error: Frame index ({}) out of range.", i),
                    None => "error: invalid frame index argument".to_string(),
                }
            }
            (Some("disassemble"), Some("-a")) => {
                let address = words
                    .next()
                    .and_then(|a| u64::from_str_radix(a.trim_start_matches("0x"), 16).ok());
                match address {
                    Some(address) => self.disassemble(address),
                    None => "error: invalid address".to_string(),
                }
            }
            (Some("expression"), Some("--")) => {
                let expr: Vec<&str> = words.collect();
                self.evaluate(&expr.join(" "))
            }
            _ => format!("error: '{}' is not a valid command.", command),
        }
    }

    fn thread_list(&self) -> String {
        let frames = self.frames();
        let top = frames
            .first()
            .map(|f| self.describe_frame(f))
            .unwrap_or_default();
        format!(
            "Process {} stopped\n* thread #1: tid = {}, {}, name = 'a.out', stop reason = {}\n",
            PID,
            THREAD_ID,
            top,
            self.stop_description()
        )
    }

    fn backtrace(&self) -> String {
        let mut out = format!(
            "* thread #1, name = 'a.out', stop reason = {}\n",
            self.stop_description()
        );
        for (i, frame) in self.frames().iter().enumerate() {
            let marker = if i == self.selected_frame { "*" } else { " " };
            out.push_str(&format!("  {} frame #{}: {}\n", marker, i, self.describe_frame(frame)));
        }
        out
    }

    fn disassemble(&self, address: u64) -> String {
        let frames = self.frames();
        let Some(frame) = frames.iter().find(|f| f.pc == address) else {
            return format!("error: Could not find function bounds for address 0x{:x}", address);
        };
        let start = frame.pc - frame.offset;
        let marker = if self.no_pc_marker { "  " } else { "->" };

        let mut out = format!("{}`{}:\n", frame.module, frame.function);
        out.push_str(&format!("    0x{:x} <+0>:  pushq  %rbp\n", start));
        out.push_str(&format!(
            "{}  0x{:x} <+{}>: movl   %eax, %r12d\n",
            marker, frame.pc, frame.offset
        ));
        out.push_str(&format!(
            "    0x{:x} <+{}>: retq\n",
            frame.pc + 3,
            frame.offset + 3
        ));
        out
    }

    /// Locals only resolve with `main` selected; the global always does
    fn evaluate(&mut self, expr: &str) -> String {
        let in_main = self
            .frames()
            .get(self.selected_frame)
            .map(|f| f.in_main)
            .unwrap_or(false);

        let value = match expr {
            "hello_world" => Some((
                "const char *",
                format!("0x{:016x} \"Hello, assertion!\"", HELLO_ADDR),
            )),
            "argc" if in_main => Some(("int", "1".to_string())),
            "argv[0]" if in_main => Some((
                "const char *",
                format!(
                    "0x{:016x} \"{}\"",
                    ARGV_ADDR + 0x248,
                    self.program.as_deref().unwrap_or("a.out")
                ),
            )),
            "null_ptr" if in_main => Some(("int *", "0x0000000000000000".to_string())),
            _ => None,
        };

        match value {
            Some((type_name, value)) => {
                let result = format!("({}) ${} = {}", type_name, self.expression_count, value);
                self.expression_count += 1;
                result
            }
            None => format!(
                "error: <user expression {}>:1:1: use of undeclared identifier '{}'",
                self.expression_count, expr
            ),
        }
    }
}

fn is_register(name: &str) -> bool {
    matches!(
        name,
        "rax" | "rbx" | "rbp" | "rsp" | "rip" | "eax" | "ebp" | "esp" | "x0" | "fp" | "sp" | "pc"
            | "r0" | "r11"
    )
}

fn register_value(name: &str) -> u64 {
    match name {
        "rbp" | "ebp" | "fp" | "r11" => 0x7fff_ffff_e290,
        "rsp" | "esp" | "sp" => 0x7fff_ffff_e160,
        "rip" | "pc" => LIBC_BASE + 0x2c,
        _ => 0,
    }
}

use std::fs;
use std::net::{SocketAddr, ToSocketAddrs};
use std::time::Duration;

use leadcomm_frame::{FrameConfig, DELIMITER};
use leadcomm_service::Connection;
use tracing::debug;

use crate::cmd::SendArgs;
use crate::exit::{service_error, CliError, CliResult, DATA_INVALID, SUCCESS, TIMEOUT, USAGE};
use crate::output::{print_message, OutputFormat};

pub fn run(args: SendArgs, format: OutputFormat) -> CliResult<i32> {
    let wait_timeout = parse_duration(&args.wait_timeout)?;
    let connect_timeout = parse_duration(&args.connect_timeout)?;
    let messages = resolve_messages(&args)?;
    let addr = resolve_addr(&args.addr)?;

    let config = FrameConfig {
        read_timeout: args.wait.then_some(wait_timeout),
        ..FrameConfig::default()
    };
    let connection = Connection::connect_timeout(addr, connect_timeout, config)
        .map_err(|err| service_error("connect failed", &err))?;

    for message in &messages {
        connection
            .send(message)
            .map_err(|err| service_error("send failed", &err))?;
    }
    debug!(peer = %connection, sent = messages.len(), "messages sent");

    if args.wait {
        let reply = connection
            .receive()
            .ok_or_else(|| no_reply(&connection.to_string(), &args.wait_timeout))?;
        print_message(&reply, &connection.to_string(), format);
    }

    if !args.keep_open && !connection.closed() {
        connection
            .disconnect()
            .map_err(|err| service_error("disconnect failed", &err))?;
    }

    Ok(SUCCESS)
}

fn resolve_addr(addr: &str) -> CliResult<SocketAddr> {
    addr.to_socket_addrs()
        .map_err(|err| CliError::new(USAGE, format!("invalid address {addr}: {err}")))?
        .next()
        .ok_or_else(|| CliError::new(USAGE, format!("address {addr} did not resolve")))
}

// A read timeout and an early hang-up both surface as `None` from receive.
fn no_reply(peer: &str, wait_timeout: &str) -> CliError {
    CliError::new(
        TIMEOUT,
        format!("no reply from {peer} (timed out after {wait_timeout} or peer closed)"),
    )
}

fn resolve_messages(args: &SendArgs) -> CliResult<Vec<Vec<u8>>> {
    let messages = match &args.file {
        Some(path) => {
            let text = fs::read_to_string(path).map_err(|err| {
                crate::exit::io_error(&format!("failed reading {}", path.display()), &err)
            })?;
            text.lines()
                .filter(|line| !line.is_empty())
                .map(|line| line.as_bytes().to_vec())
                .collect()
        }
        None => args.data.iter().map(|d| d.as_bytes().to_vec()).collect(),
    };
    check_messages(messages)
}

fn check_messages(messages: Vec<Vec<u8>>) -> CliResult<Vec<Vec<u8>>> {
    if messages.is_empty() {
        return Err(CliError::new(USAGE, "nothing to send: use --data or --file"));
    }
    if let Some(index) = messages.iter().position(|m| m.contains(&DELIMITER)) {
        return Err(CliError::new(
            DATA_INVALID,
            format!(
                "message {} contains the delimiter {:?}",
                index + 1,
                char::from(DELIMITER)
            ),
        ));
    }
    Ok(messages)
}

fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, unit) = if let Some(num) = input.strip_suffix("ms") {
        (num, "ms")
    } else if let Some(num) = input.strip_suffix('s') {
        (num, "s")
    } else {
        (input, "s")
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    match unit {
        "ms" => Ok(Duration::from_millis(value)),
        _ => Ok(Duration::from_secs(value)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_duration_seconds_and_millis() {
        assert_eq!(parse_duration("2s").unwrap(), Duration::from_secs(2));
        assert_eq!(parse_duration("150ms").unwrap(), Duration::from_millis(150));
        assert_eq!(parse_duration("3").unwrap(), Duration::from_secs(3));
    }

    #[test]
    fn parse_duration_rejects_invalid_values() {
        assert!(parse_duration("0s").is_err());
        assert!(parse_duration("bad").is_err());
        assert!(parse_duration(" ").is_err());
    }

    #[test]
    fn messages_with_delimiter_are_rejected_before_connecting() {
        let err = check_messages(vec![b"ok".to_vec(), b"a;b".to_vec()]).unwrap_err();
        assert_eq!(err.code, DATA_INVALID);
        assert!(err.message.starts_with("message 2"));
    }

    #[test]
    fn empty_message_list_is_a_usage_error() {
        assert_eq!(check_messages(Vec::new()).unwrap_err().code, USAGE);
    }

    #[test]
    fn file_lines_become_messages() {
        let path = std::env::temp_dir().join(format!("leadcomm-send-{}.txt", std::process::id()));
        fs::write(&path, "PING\n\nPONG\n").unwrap();
        let args = SendArgs {
            addr: "127.0.0.1:1".to_string(),
            data: Vec::new(),
            file: Some(path.clone()),
            keep_open: false,
            wait: false,
            wait_timeout: "5s".to_string(),
            connect_timeout: "5s".to_string(),
        };
        let messages = resolve_messages(&args).unwrap();
        let _ = fs::remove_file(&path);
        assert_eq!(messages, vec![b"PING".to_vec(), b"PONG".to_vec()]);
    }

    #[test]
    fn addresses_resolve_or_fail_as_usage() {
        assert_eq!(
            resolve_addr("127.0.0.1:7000").unwrap(),
            "127.0.0.1:7000".parse::<SocketAddr>().unwrap()
        );
        assert_eq!(resolve_addr("no-port-here").unwrap_err().code, USAGE);
    }

    #[test]
    fn missing_reply_names_both_causes() {
        let err = no_reply("127.0.0.1:7000", "3s");
        assert_eq!(err.code, TIMEOUT);
        assert_eq!(
            err.message,
            "no reply from 127.0.0.1:7000 (timed out after 3s or peer closed)"
        );
    }
}

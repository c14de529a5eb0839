use std::fs;
use std::io::Read;

use stompsync_frame::{FrameError, FrameParser};
use tracing::debug;

use crate::cmd::DecodeArgs;
use crate::exit::{frame_error, io_error, CliResult, SUCCESS};
use crate::output::{print_frame, OutputFormat};

pub fn run(args: DecodeArgs, format: OutputFormat) -> CliResult<i32> {
    let input = match &args.file {
        Some(path) => fs::read(path)
            .map_err(|err| io_error(&format!("failed reading {}", path.display()), err))?,
        None => {
            let mut buf = Vec::new();
            std::io::stdin()
                .read_to_end(&mut buf)
                .map_err(|err| io_error("failed reading stdin", err))?;
            buf
        }
    };

    let decoded = decode(&input, args.chunk_size.get(), |seq, frame| {
        print_frame(seq, frame, format)
    })?;
    debug!(frames = decoded, bytes = input.len(), "decode finished");
    Ok(SUCCESS)
}

/// Feed `input` to a fresh parser `chunk_size` bytes at a time, handing each
/// completed frame to `emit`. Returns the number of frames decoded.
fn decode(
    input: &[u8],
    chunk_size: usize,
    mut emit: impl FnMut(usize, &stompsync_frame::Frame),
) -> CliResult<usize> {
    let mut parser = FrameParser::new();
    let mut decoded = 0usize;

    for chunk in input.chunks(chunk_size) {
        if !parser.process_incoming(chunk) {
            let err = parser.take_error().unwrap_or(FrameError::Poisoned);
            return Err(frame_error(
                &format!("decode failed after {decoded} frames"),
                err,
            ));
        }
        while let Some(frame) = parser.take_next_frame() {
            decoded += 1;
            emit(decoded, &frame);
        }
    }
    Ok(decoded)
}

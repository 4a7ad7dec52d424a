//! Check system capabilities.

use retrack_engine::command_exists;

pub fn run() -> anyhow::Result<()> {
    println!("Retrack System Check");
    println!("{}", "=".repeat(50));

    let ffmpeg = command_exists("ffmpeg");
    let ffprobe = command_exists("ffprobe");

    println!(
        "{} ffmpeg: {}",
        if ffmpeg { "[OK]" } else { "[MISSING]" },
        if ffmpeg { "found on PATH" } else { "not found" }
    );
    println!(
        "{} ffprobe: {}",
        if ffprobe { "[OK]" } else { "[MISSING]" },
        if ffprobe { "found on PATH" } else { "not found" }
    );

    println!();
    if ffmpeg && ffprobe {
        println!("All required tools are available. Retrack is ready.");
    } else {
        println!("Install ffmpeg (which provides ffprobe) and re-run this check.");
    }

    Ok(())
}

use std::fs;

use crate::cli::commands::InitArgs;
use crate::io::config_io::CONFIG_FILE_NAME;

const CONFIG_TEMPLATE: &str = r##"# itinera configuration. Every value shown is the default.

[enforcer]
# Repair attempts before the deterministic fallback is used
max_attempts = 3
# Shell command that reads a repair prompt on stdin and prints markdown.
# Leave unset to skip repair and fall back immediately.
# fix_command = "my-llm-fix --model small"
fix_timeout_secs = 60

[schedule]
# Sightseeing window. Transport and lodging may sit outside it.
day_start = "09:00"
day_end = "20:00"
transit_buffer_minutes = 15
# Slot given to each POI appended by the guardrail
slot_minutes = 60

[durations]
meal = 60
transport = 30
heavy = 180
medium = 90
default = 75
# heavy_keywords = ["大世界", "雪博会", "虎林园", "乐园", "迪士尼", "欢乐谷", "动物园", "海洋馆", "海洋公园"]
# medium_keywords = ["公园", "博物馆", "教堂", "纪念馆", "美术馆", "陈列馆", "寺", "古镇"]

[extract]
# Longest note prose addenda may grow an item's note to
note_max_chars = 200

[quality]
# Plans with fewer real rows are rebuilt from the source's POIs
min_usable_rows = 2
"##;

pub fn cmd_init(args: InitArgs) -> Result<(), Box<dyn std::error::Error>> {
    let cwd = std::env::current_dir()?;
    let path = cwd.join(CONFIG_FILE_NAME);

    if path.exists() && !args.force {
        return Err(format!("{} already exists (use --force to overwrite)", CONFIG_FILE_NAME).into());
    }

    fs::write(&path, CONFIG_TEMPLATE)?;
    println!("Wrote {}", path.display());
    Ok(())
}

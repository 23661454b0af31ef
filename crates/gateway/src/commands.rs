//! Slash-command table.
//!
//! A message is a command when its first whitespace-delimited token is an
//! exact key of the table. Everything after that token is the argument.

use crate::languages;

pub const HELP: &str = "/查看指令";
pub const TRANSLATE: &str = "/翻譯助理";
pub const DRAW: &str = "/幫畫";
pub const WEATHER: &str = "/天氣查詢";
pub const ACCOUNTING: &str = "/記帳助理";
pub const EXIT: &str = "/退出";

pub const EXIT_REPLY: &str = "已退出指令模式，可以继续聊天了";

/// What the router should do for a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandAction {
    /// Reply with fixed text.
    Reply(String),
    /// Switch the sender into translation mode and confirm.
    EnterTranslation { language: &'static str },
    /// Ask the generative backend with a task prompt.
    Delegate { prompt: String },
    /// Leave any mode.
    Exit,
}

/// Split `text` into its first token and the trimmed remainder.
pub fn split_command(text: &str) -> (&str, &str) {
    let text = text.trim();
    match text.split_once(char::is_whitespace) {
        Some((command, args)) => (command, args.trim()),
        None => (text, ""),
    }
}

/// Resolve `text` against the table; `None` means it is not a command.
pub fn resolve(text: &str) -> Option<CommandAction> {
    let (command, args) = split_command(text);
    let action = match command {
        HELP => CommandAction::Reply(help_text()),
        TRANSLATE => match languages::lookup(args) {
            Some(language) => CommandAction::EnterTranslation {
                language: language.name,
            },
            None => CommandAction::Reply(format!(
                "請在指令後加上語言，例如：{TRANSLATE} 英文\n支援的語言：{}",
                languages::names().join("、")
            )),
        },
        DRAW => delegate(
            args,
            "請描述想畫的內容，例如：/幫畫 夕陽下的貓",
            |a| format!("請用生動的文字描繪這幅畫面，包含構圖、色彩與氛圍：{a}"),
        ),
        WEATHER => delegate(
            args,
            "請提供地點，例如：/天氣查詢 台北",
            |a| format!("請說明{a}常見的天氣概況，並提醒出門穿著與注意事項。"),
        ),
        ACCOUNTING => delegate(
            args,
            "請輸入收支項目，例如：/記帳助理 午餐 120、咖啡 65",
            |a| {
                format!(
                    "你是一位記帳助理。請將以下收支整理成條列清單，並計算總支出與總收入：\n{a}"
                )
            },
        ),
        EXIT => CommandAction::Exit,
        _ => return None,
    };
    Some(action)
}

fn delegate(args: &str, usage: &str, prompt: impl FnOnce(&str) -> String) -> CommandAction {
    if args.is_empty() {
        CommandAction::Reply(usage.to_string())
    } else {
        CommandAction::Delegate {
            prompt: prompt(args),
        }
    }
}

pub fn help_text() -> String {
    [
        "可用指令：",
        "/查看指令 - 顯示這份說明",
        "/翻譯助理 <語言> - 進入翻譯模式",
        "/幫畫 <描述> - 用文字描繪畫面",
        "/天氣查詢 <地點> - 天氣概況與建議",
        "/記帳助理 <收支> - 整理收支並計算總額",
        "/退出 - 離開目前模式",
    ]
    .join("\n")
}

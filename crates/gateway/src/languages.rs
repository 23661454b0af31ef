//! Target languages offered by the translation assistant.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Language {
    /// Display name, also the postback data of the language picker.
    pub name: &'static str,
    /// BCP 47 tag.
    pub code: &'static str,
}

const LANGUAGES: &[Language] = &[
    Language {
        name: "繁體中文",
        code: "zh-TW",
    },
    Language {
        name: "簡體中文",
        code: "zh-CN",
    },
    Language {
        name: "英文",
        code: "en",
    },
    Language {
        name: "日文",
        code: "ja",
    },
    Language {
        name: "韓文",
        code: "ko",
    },
    Language {
        name: "法文",
        code: "fr",
    },
    Language {
        name: "德文",
        code: "de",
    },
    Language {
        name: "西班牙文",
        code: "es",
    },
    Language {
        name: "泰文",
        code: "th",
    },
    Language {
        name: "越南文",
        code: "vi",
    },
];

/// Find a language by display name or code.
pub fn lookup(key: &str) -> Option<&'static Language> {
    let key = key.trim();
    LANGUAGES
        .iter()
        .find(|l| l.name == key || l.code.eq_ignore_ascii_case(key))
}

pub fn names() -> Vec<&'static str> {
    LANGUAGES.iter().map(|l| l.name).collect()
}

/// Prompt asking the backend to translate `text` into `language`.
pub fn translation_prompt(language: &str, text: &str) -> String {
    format!("請將以下文字翻譯成{language}，只回覆翻譯結果，不要加上任何說明：\n{text}")
}

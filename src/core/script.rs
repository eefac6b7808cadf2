// src/core/script.rs
//! Romanized input to kana, and the answer character check.

const N_KANA: char = 'ん';

/// The character-normalization capability the session relies on.
pub trait ScriptConverter {
    /// True for a phonetic or logographic character of the target script.
    fn is_script(&self, c: char) -> bool;
    /// Converts romanized text to the target script, passing through anything it
    /// cannot convert.
    fn transliterate(&self, text: &str) -> String;
}

/// A romaji to hiragana converter.
#[derive(Debug, Default, Clone, Copy)]
pub struct KanaConverter;

impl KanaConverter {
    pub fn new() -> Self {
        Self
    }

    #[rustfmt::skip]
    fn syllable(&self, s: &str) -> Option<&'static str> {
        let kana = match s {
            "a" => "あ", "i" => "い", "u" => "う", "e" => "え", "o" => "お",
            "ka" => "か", "ki" => "き", "ku" => "く", "ke" => "け", "ko" => "こ",
            "ga" => "が", "gi" => "ぎ", "gu" => "ぐ", "ge" => "げ", "go" => "ご",
            "sa" => "さ", "shi" | "si" => "し", "su" => "す", "se" => "せ", "so" => "そ",
            "za" => "ざ", "ji" | "zi" => "じ", "zu" => "ず", "ze" => "ぜ", "zo" => "ぞ",
            "ta" => "た", "chi" | "ti" => "ち", "tsu" | "tu" => "つ", "te" => "て", "to" => "と",
            "da" => "だ", "di" => "ぢ", "du" => "づ", "de" => "で", "do" => "ど",
            "na" => "な", "ni" => "に", "nu" => "ぬ", "ne" => "ね", "no" => "の",
            "ha" => "は", "hi" => "ひ", "fu" | "hu" => "ふ", "he" => "へ", "ho" => "ほ",
            "ba" => "ば", "bi" => "び", "bu" => "ぶ", "be" => "べ", "bo" => "ぼ",
            "pa" => "ぱ", "pi" => "ぴ", "pu" => "ぷ", "pe" => "ぺ", "po" => "ぽ",
            "ma" => "ま", "mi" => "み", "mu" => "む", "me" => "め", "mo" => "も",
            "ya" => "や", "yu" => "ゆ", "yo" => "よ",
            "ra" => "ら", "ri" => "り", "ru" => "る", "re" => "れ", "ro" => "ろ",
            "wa" => "わ", "wo" => "を",
            "kya" => "きゃ", "kyu" => "きゅ", "kyo" => "きょ",
            "gya" => "ぎゃ", "gyu" => "ぎゅ", "gyo" => "ぎょ",
            "sha" | "sya" => "しゃ", "shu" | "syu" => "しゅ", "sho" | "syo" => "しょ",
            "ja" | "jya" | "zya" => "じゃ",
            "ju" | "jyu" | "zyu" => "じゅ",
            "jo" | "jyo" | "zyo" => "じょ",
            "cha" | "tya" => "ちゃ", "chu" | "tyu" => "ちゅ", "cho" | "tyo" => "ちょ",
            "nya" => "にゃ", "nyu" => "にゅ", "nyo" => "にょ",
            "hya" => "ひゃ", "hyu" => "ひゅ", "hyo" => "ひょ",
            "bya" => "びゃ", "byu" => "びゅ", "byo" => "びょ",
            "pya" => "ぴゃ", "pyu" => "ぴゅ", "pyo" => "ぴょ",
            "mya" => "みゃ", "myu" => "みゅ", "myo" => "みょ",
            "rya" => "りゃ", "ryu" => "りゅ", "ryo" => "りょ",
            "-" => "ー",
            _ => return None,
        };
        Some(kana)
    }
}

impl ScriptConverter for KanaConverter {
    fn is_script(&self, c: char) -> bool {
        matches!(c,
            '\u{3041}'..='\u{3096}'   // hiragana
            | '\u{309D}'..='\u{309F}' // hiragana iteration marks
            | '\u{30A1}'..='\u{30FA}' // katakana
            | '\u{30FC}'..='\u{30FF}' // prolonged sound mark, katakana iteration marks
            | '\u{3400}'..='\u{4DBF}' // CJK extension A
            | '\u{4E00}'..='\u{9FFF}' // CJK unified ideographs
            | '々' | '〆' | 'ヶ')
    }

    /// Greedy longest-match conversion. Double consonants become っ, and `n`
    /// becomes ん before a consonant. A final lone `n` is left as is,
    /// since more input could still turn it into な/に/...
    fn transliterate(&self, text: &str) -> String {
        let chars: Vec<char> = text.chars().collect();
        let mut result = String::with_capacity(text.len() * 3);
        let mut i = 0;

        while i < chars.len() {
            let c = chars[i].to_ascii_lowercase();
            let next = chars.get(i + 1).map(|n| n.to_ascii_lowercase());

            if c == 'n' {
                match next {
                    Some('n') => {
                        // "nni" is ん + に, "nn" on its own is ん
                        let after = chars.get(i + 2).map(|a| a.to_ascii_lowercase());
                        let second_starts_syllable = after.is_some_and(|a| "aiueoy".contains(a));
                        result.push(N_KANA);
                        i += if second_starts_syllable { 1 } else { 2 };
                        continue;
                    }
                    Some(n) if n.is_ascii_alphabetic() && !"aiueoy".contains(n) => {
                        result.push(N_KANA);
                        i += 1;
                        continue;
                    }
                    _ => {}
                }
            }

            if c.is_ascii_alphabetic() && !"aiueon".contains(c) && next == Some(c) {
                result.push('っ');
                i += 1;
                continue;
            }

            let matched = (1..=3).rev().find_map(|len| {
                if i + len > chars.len() {
                    return None;
                }
                let candidate: String =
                    chars[i..i + len].iter().map(|c| c.to_ascii_lowercase()).collect();
                self.syllable(&candidate).map(|kana| (len, kana))
            });

            match matched {
                Some((len, kana)) => {
                    result.push_str(kana);
                    i += len;
                }
                None => {
                    result.push(chars[i]);
                    i += 1;
                }
            }
        }

        result
    }
}

/// Converts romanized input, then turns a leftover final `n` into ん.
pub fn normalize_answer(raw: &str, converter: &impl ScriptConverter) -> String {
    let converted = converter.transliterate(&raw.trim().to_ascii_lowercase());
    match converted.strip_suffix('n') {
        Some(stem) => format!("{stem}{N_KANA}"),
        None => converted,
    }
}

/// Every character is a script character or allow-listed, and there is at least one.
pub fn is_valid_answer(answer: &str, converter: &impl ScriptConverter) -> bool {
    !answer.is_empty() && answer.chars().all(|c| converter.is_script(c) || is_allowed_symbol(c))
}

fn is_allowed_symbol(c: char) -> bool {
    matches!(c,
        '0'..='9'
        | '\u{FF10}'..='\u{FF19}' // full-width digits
        | '、' | '。' | '〜' | '・'
        | '？' | '！' | '（' | '）')
}

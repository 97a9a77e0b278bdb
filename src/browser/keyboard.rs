//! Keyboard key definitions and key token parsing.
//!
//! A key token names one key press, optionally with modifiers:
//!
//! | Token | Key | Modifiers |
//! |-------|-----|-----------|
//! | `"t"` | `t` | none |
//! | `"T"` | `T` | Shift |
//! | `"Escape"`, `"Esc"` | `Escape` | none |
//! | `"Shift+Tab"` | `Tab` | Shift |
//! | `"Ctrl+'"` | `'` | Ctrl |
//! | `"Ctrl++"` | `+` | Ctrl, Shift |
//! | `"Ctrl+Shift+k"` | `K` | Ctrl, Shift |
//!
//! # Example
//!
//! ```
//! use cdp_harness::{KeyStroke, Modifiers};
//!
//! let stroke = KeyStroke::parse("Ctrl+Shift+k").unwrap();
//! assert_eq!(stroke.key(), "K");
//! assert_eq!(stroke.modifiers(), Modifiers::CTRL | Modifiers::SHIFT);
//! assert_eq!(stroke.text(), None);
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::ops::{BitOr, BitOrAssign};
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::protocol::{KeyEventParams, KeyEventType};

// ============================================================================
// Modifiers
// ============================================================================

/// CDP modifier bit field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Modifiers(u8);

impl Modifiers {
    /// No modifier.
    pub const NONE: Self = Self(0);
    /// Alt / Option.
    pub const ALT: Self = Self(1);
    /// Control.
    pub const CTRL: Self = Self(2);
    /// Meta / Command.
    pub const META: Self = Self(4);
    /// Shift.
    pub const SHIFT: Self = Self(8);

    /// Returns the raw bits.
    #[inline]
    #[must_use]
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Returns `true` if every bit of `other` is set.
    #[inline]
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Returns `true` if no modifier is set.
    #[inline]
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Returns `true` if Ctrl, Alt or Meta is held; such presses carry no text.
    #[inline]
    #[must_use]
    pub const fn suppresses_text(self) -> bool {
        self.0 & (Self::ALT.0 | Self::CTRL.0 | Self::META.0) != 0
    }

    /// Parses a modifier name, case-insensitively.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "ctrl" | "control" => Some(Self::CTRL),
            "alt" | "option" => Some(Self::ALT),
            "shift" => Some(Self::SHIFT),
            "meta" | "cmd" | "command" => Some(Self::META),
            _ => None,
        }
    }
}

impl BitOr for Modifiers {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for Modifiers {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl fmt::Display for Modifiers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const NAMES: [(Modifiers, &str); 4] = [
            (Modifiers::CTRL, "Ctrl"),
            (Modifiers::ALT, "Alt"),
            (Modifiers::META, "Meta"),
            (Modifiers::SHIFT, "Shift"),
        ];
        let mut first = true;
        for (modifier, name) in NAMES {
            if self.contains(modifier) {
                if !first {
                    f.write_str("+")?;
                }
                f.write_str(name)?;
                first = false;
            }
        }
        Ok(())
    }
}

// ============================================================================
// Key Enum
// ============================================================================

/// Named, non-character keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    // ========================================================================
    // Navigation & Control
    // ========================================================================
    /// Enter/Return key
    Enter,
    /// Tab key
    Tab,
    /// Escape key
    Escape,
    /// Backspace key
    Backspace,
    /// Delete key
    Delete,
    /// Insert key
    Insert,
    /// Space bar
    Space,

    // ========================================================================
    // Arrow Keys
    // ========================================================================
    /// Arrow Up
    ArrowUp,
    /// Arrow Down
    ArrowDown,
    /// Arrow Left
    ArrowLeft,
    /// Arrow Right
    ArrowRight,

    // ========================================================================
    // Page Navigation
    // ========================================================================
    /// Home key
    Home,
    /// End key
    End,
    /// Page Up key
    PageUp,
    /// Page Down key
    PageDown,

    // ========================================================================
    // Function Keys
    // ========================================================================
    /// Function key `F1`..=`F12`.
    Function(u8),
}

const FUNCTION_KEY_NAMES: [&str; 12] = [
    "F1", "F2", "F3", "F4", "F5", "F6", "F7", "F8", "F9", "F10", "F11", "F12",
];

impl Key {
    /// Returns the key properties: (key, code, keyCode, text).
    #[must_use]
    pub fn properties(self) -> (&'static str, &'static str, u32, Option<&'static str>) {
        match self {
            Key::Enter => ("Enter", "Enter", 13, Some("\r")),
            Key::Tab => ("Tab", "Tab", 9, None),
            Key::Escape => ("Escape", "Escape", 27, None),
            Key::Backspace => ("Backspace", "Backspace", 8, None),
            Key::Delete => ("Delete", "Delete", 46, None),
            Key::Insert => ("Insert", "Insert", 45, None),
            Key::Space => (" ", "Space", 32, Some(" ")),
            Key::ArrowUp => ("ArrowUp", "ArrowUp", 38, None),
            Key::ArrowDown => ("ArrowDown", "ArrowDown", 40, None),
            Key::ArrowLeft => ("ArrowLeft", "ArrowLeft", 37, None),
            Key::ArrowRight => ("ArrowRight", "ArrowRight", 39, None),
            Key::Home => ("Home", "Home", 36, None),
            Key::End => ("End", "End", 35, None),
            Key::PageUp => ("PageUp", "PageUp", 33, None),
            Key::PageDown => ("PageDown", "PageDown", 34, None),
            Key::Function(n) => {
                let index = usize::from(n.clamp(1, 12) - 1);
                let name = FUNCTION_KEY_NAMES[index];
                (name, name, 111 + u32::from(n.clamp(1, 12)), None)
            }
        }
    }

    /// Returns the key value string.
    #[inline]
    #[must_use]
    pub fn key(self) -> &'static str {
        self.properties().0
    }

    /// Returns the code string.
    #[inline]
    #[must_use]
    pub fn code(self) -> &'static str {
        self.properties().1
    }

    /// Returns the legacy keyCode.
    #[inline]
    #[must_use]
    pub fn key_code(self) -> u32 {
        self.properties().2
    }

    /// Returns whether this key produces printable output.
    #[inline]
    #[must_use]
    pub fn is_printable(self) -> bool {
        self.properties().3.is_some()
    }

    /// Looks up a key by name or alias, case-insensitively.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        let lower = name.to_ascii_lowercase();
        let key = match lower.as_str() {
            "enter" | "return" => Key::Enter,
            "tab" => Key::Tab,
            "escape" | "esc" => Key::Escape,
            "backspace" => Key::Backspace,
            "delete" | "del" => Key::Delete,
            "insert" | "ins" => Key::Insert,
            "space" | "spacebar" => Key::Space,
            "arrowup" | "up" => Key::ArrowUp,
            "arrowdown" | "down" => Key::ArrowDown,
            "arrowleft" | "left" => Key::ArrowLeft,
            "arrowright" | "right" => Key::ArrowRight,
            "home" => Key::Home,
            "end" => Key::End,
            "pageup" | "pgup" => Key::PageUp,
            "pagedown" | "pgdn" => Key::PageDown,
            _ => {
                let digits = lower.strip_prefix('f')?;
                if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
                    return None;
                }
                let n: u8 = digits.parse().ok()?;
                if !(1..=12).contains(&n) {
                    return None;
                }
                Key::Function(n)
            }
        };
        Some(key)
    }
}

// ============================================================================
// Character Layout
// ============================================================================

/// US layout properties of a character: (code, keyCode, needs Shift).
fn char_properties(c: char) -> Option<(String, u32, bool)> {
    let props = match c {
        'a'..='z' => (
            format!("Key{}", c.to_ascii_uppercase()),
            u32::from(c.to_ascii_uppercase()),
            false,
        ),
        'A'..='Z' => (format!("Key{c}"), u32::from(c), true),
        '0'..='9' => (format!("Digit{c}"), u32::from(c), false),
        _ => {
            let (code, key_code, shifted) = punctuation(c)?;
            (code.to_string(), key_code, shifted)
        }
    };
    Some(props)
}

/// US layout punctuation and shifted digits: character, code, keyCode, shifted.
const PUNCTUATION: &[(char, &str, u32, bool)] = &[
    ('`', "Backquote", 192, false),
    ('~', "Backquote", 192, true),
    ('-', "Minus", 189, false),
    ('_', "Minus", 189, true),
    ('=', "Equal", 187, false),
    ('+', "Equal", 187, true),
    ('[', "BracketLeft", 219, false),
    ('{', "BracketLeft", 219, true),
    (']', "BracketRight", 221, false),
    ('}', "BracketRight", 221, true),
    ('\\', "Backslash", 220, false),
    ('|', "Backslash", 220, true),
    (';', "Semicolon", 186, false),
    (':', "Semicolon", 186, true),
    ('\'', "Quote", 222, false),
    ('"', "Quote", 222, true),
    (',', "Comma", 188, false),
    ('<', "Comma", 188, true),
    ('.', "Period", 190, false),
    ('>', "Period", 190, true),
    ('/', "Slash", 191, false),
    ('?', "Slash", 191, true),
    ('!', "Digit1", 49, true),
    ('@', "Digit2", 50, true),
    ('#', "Digit3", 51, true),
    ('$', "Digit4", 52, true),
    ('%', "Digit5", 53, true),
    ('^', "Digit6", 54, true),
    ('&', "Digit7", 55, true),
    ('*', "Digit8", 56, true),
    ('(', "Digit9", 57, true),
    (')', "Digit0", 48, true),
];

fn punctuation(c: char) -> Option<(&'static str, u32, bool)> {
    PUNCTUATION
        .iter()
        .find(|(ch, ..)| *ch == c)
        .map(|&(_, code, key_code, shifted)| (code, key_code, shifted))
}

/// Character produced by the same physical key with Shift held.
fn shifted_char(c: char) -> Option<char> {
    if c.is_ascii_lowercase() {
        return Some(c.to_ascii_uppercase());
    }
    let (code, _, shifted) = char_properties(c)?;
    if shifted {
        return Some(c);
    }
    PUNCTUATION
        .iter()
        .find(|(_, other, _, shifted)| *shifted && *other == code)
        .map(|&(ch, ..)| ch)
}

// ============================================================================
// KeyStroke
// ============================================================================

/// A fully resolved key press.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyStroke {
    key: String,
    code: String,
    key_code: u32,
    text: Option<String>,
    modifiers: Modifiers,
}

impl KeyStroke {
    /// Parses a key token.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownKey`] if the token is empty, ends in a dangling
    /// `+`, or names neither a known key nor a single printable character.
    pub fn parse(token: &str) -> Result<Self> {
        let mut modifiers = Modifiers::NONE;
        let mut rest = token;

        while let Some((head, tail)) = rest.split_once('+') {
            if head.is_empty() {
                break;
            }
            let Some(modifier) = Modifiers::from_name(head) else {
                break;
            };
            if tail.is_empty() {
                return Err(Error::unknown_key(token));
            }
            modifiers |= modifier;
            rest = tail;
        }

        if let Some(key) = Key::from_name(rest) {
            return Ok(Self::from_key(key, modifiers));
        }

        let mut chars = rest.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Self::from_char(c, modifiers).ok_or_else(|| Error::unknown_key(token)),
            _ => Err(Error::unknown_key(token)),
        }
    }

    /// Builds a stroke for a named key.
    #[must_use]
    pub fn from_key(key: Key, modifiers: Modifiers) -> Self {
        let (name, code, key_code, text) = key.properties();
        Self {
            key: name.to_string(),
            code: code.to_string(),
            key_code,
            text: text
                .filter(|_| !modifiers.suppresses_text())
                .map(str::to_string),
            modifiers,
        }
    }

    /// Builds a stroke for a single character.
    ///
    /// Returns `None` for control characters. Characters outside the US
    /// layout are sent with an empty code and keyCode 0.
    #[must_use]
    pub fn from_char(c: char, mut modifiers: Modifiers) -> Option<Self> {
        if c == ' ' {
            return Some(Self::from_key(Key::Space, modifiers));
        }
        if c.is_control() {
            return None;
        }

        let (code, key_code, shifted) = char_properties(c).unwrap_or((String::new(), 0, false));
        if shifted {
            modifiers |= Modifiers::SHIFT;
        }

        let c = if modifiers.contains(Modifiers::SHIFT) {
            shifted_char(c).unwrap_or(c)
        } else {
            c
        };

        Some(Self {
            key: c.to_string(),
            code,
            key_code,
            text: (!modifiers.suppresses_text()).then(|| c.to_string()),
            modifiers,
        })
    }

    /// Returns the DOM `key` value.
    #[inline]
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Returns the DOM `code` value.
    #[inline]
    #[must_use]
    pub fn code(&self) -> &str {
        &self.code
    }

    /// Returns the Windows virtual keyCode.
    #[inline]
    #[must_use]
    pub fn key_code(&self) -> u32 {
        self.key_code
    }

    /// Returns the generated text, if any.
    #[inline]
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    /// Returns the held modifiers.
    #[inline]
    #[must_use]
    pub fn modifiers(&self) -> Modifiers {
        self.modifiers
    }

    /// Returns the `keyDown` and `keyUp` event parameters.
    #[must_use]
    pub fn key_events(&self) -> [KeyEventParams; 2] {
        let key_code = (self.key_code != 0).then_some(self.key_code);
        let down = KeyEventParams {
            event_type: KeyEventType::KeyDown,
            modifiers: self.modifiers.bits(),
            key: self.key.clone(),
            code: self.code.clone(),
            text: self.text.clone(),
            unmodified_text: self.text.clone(),
            windows_virtual_key_code: key_code,
            native_virtual_key_code: key_code,
        };
        let up = KeyEventParams {
            event_type: KeyEventType::KeyUp,
            text: None,
            unmodified_text: None,
            ..down.clone()
        };
        [down, up]
    }
}

impl FromStr for KeyStroke {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for KeyStroke {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.modifiers.is_empty() {
            f.write_str(&self.key)
        } else {
            write!(f, "{}+{}", self.modifiers, self.key)
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

//! Statement 이름 생성
//!
//! 쿼리 텍스트의 64비트 비암호학적 다이제스트를 prepared statement 이름으로
//! 사용합니다. 같은 텍스트는 항상 같은 이름이 되고, 충돌 가능성은 감수합니다.

use std::fmt;

use xxhash_rust::xxh3::xxh3_64;

/// 쿼리 텍스트 다이제스트
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint(u64);

impl Fingerprint {
    /// SQL 텍스트의 다이제스트를 계산합니다.
    pub fn of(sql: &str) -> Self {
        Self(xxh3_64(sql.as_bytes()))
    }

    /// 원시 64비트 값
    pub fn value(self) -> u64 {
        self.0
    }

    /// statement 이름 (16자 소문자 hex)
    pub fn name(self) -> String {
        hex::encode(self.0.to_be_bytes())
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

/// SQL 텍스트로부터 statement 이름을 계산합니다.
pub fn fingerprint(sql: &str) -> String {
    Fingerprint::of(sql).name()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_text_same_name() {
        let sql = "SELECT id FROM vuln WHERE package_name = ?1";
        assert_eq!(fingerprint(sql), fingerprint(sql));
    }

    #[test]
    fn different_text_different_name() {
        assert_ne!(
            fingerprint("SELECT 1 FROM vuln WHERE dist_id = ?3"),
            fingerprint("SELECT 1 FROM vuln WHERE dist_arch = ?3")
        );
    }

    #[test]
    fn name_is_sixteen_lowercase_hex_chars() {
        let name = fingerprint("SELECT 1");
        assert_eq!(name.len(), 16);
        assert!(name.chars().all(|c| matches!(c, '0'..='9' | 'a'..='f')));
    }

    #[test]
    fn name_encodes_value_big_endian() {
        let fp = Fingerprint::of("anything");
        assert_eq!(fp.name(), format!("{:016x}", fp.value()));
        assert_eq!(fp.to_string(), fp.name());
    }
}

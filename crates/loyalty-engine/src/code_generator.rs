//! 推荐码 / 会员码生成
//!
//! 生成器只负责产出候选码，唯一性由服务层查询存储后决定

use std::collections::VecDeque;

use parking_lot::Mutex;
use rand::Rng;

const CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

pub trait CodeGenerator: Send + Sync {
    fn generate(&self, length: usize) -> String;
}

/// 从 [A-Z0-9] 随机取字符
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomCodeGenerator;

impl CodeGenerator for RandomCodeGenerator {
    fn generate(&self, length: usize) -> String {
        let mut rng = rand::rng();
        (0..length)
            .map(|_| CODE_ALPHABET[rng.random_range(0..CODE_ALPHABET.len())] as char)
            .collect()
    }
}

/// 按预设顺序产出候选码，用完后退回随机生成
///
/// 用于复现碰撞重试
#[derive(Debug, Default)]
pub struct SequenceCodeGenerator {
    queue: Mutex<VecDeque<String>>,
}

impl SequenceCodeGenerator {
    pub fn new<I, S>(codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            queue: Mutex::new(codes.into_iter().map(Into::into).collect()),
        }
    }

    pub fn remaining(&self) -> usize {
        self.queue.lock().len()
    }
}

impl CodeGenerator for SequenceCodeGenerator {
    fn generate(&self, length: usize) -> String {
        self.queue
            .lock()
            .pop_front()
            .unwrap_or_else(|| RandomCodeGenerator.generate(length))
    }
}

/// 校验推荐码格式
pub fn is_well_formed(code: &str, length: usize) -> bool {
    code.len() == length && code.bytes().all(|b| CODE_ALPHABET.contains(&b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_code_shape() {
        let generator = RandomCodeGenerator;
        for _ in 0..100 {
            let code = generator.generate(8);
            assert!(is_well_formed(&code, 8), "bad code {code}");
        }
    }

    #[test]
    fn test_sequence_generator_then_random() {
        let generator = SequenceCodeGenerator::new(["AAAAAAAA", "BBBBBBBB"]);
        assert_eq!(generator.generate(8), "AAAAAAAA");
        assert_eq!(generator.generate(8), "BBBBBBBB");
        assert_eq!(generator.remaining(), 0);
        assert_eq!(generator.generate(8).len(), 8);
    }

    #[test]
    fn test_is_well_formed() {
        assert!(is_well_formed("AB12CD34", 8));
        assert!(!is_well_formed("ab12cd34", 8));
        assert!(!is_well_formed("AB12CD3", 8));
        assert!(!is_well_formed("AB12-D34", 8));
    }
}

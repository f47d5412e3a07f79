use crate::Result;
use crate::constants::checksum::READ_BLOCK_SIZE;
use sha2::{Digest, Sha256};
use std::io::Read;
use std::path::Path;

/// 计算文件的 SHA-256 校验和（十六进制小写）
///
/// 按固定块流式读取，避免把整个归档读进内存。
/// 计算在后台线程中执行，不阻塞异步运行时。
pub async fn sha256_file<P: AsRef<Path>>(path: P) -> Result<String> {
    let path = path.as_ref().to_path_buf();

    let digest = tokio::task::spawn_blocking(move || {
        let mut file = std::fs::File::open(&path)?;
        let mut hasher = Sha256::new();
        let mut buf = [0u8; READ_BLOCK_SIZE];

        loop {
            let n = file.read(&mut buf)?;
            if n == 0 {
                break;
            }
            hasher.update(&buf[..n]);
        }

        Ok::<String, crate::WardenError>(format!("{:x}", hasher.finalize()))
    })
    .await??;

    Ok(digest)
}

/// 重新计算校验和并与期望值比较
///
/// 校验和不匹配或文件不可读都返回 false，不抛出错误。
pub async fn verify_file<P: AsRef<Path>>(path: P, expected: &str) -> bool {
    match sha256_file(path).await {
        Ok(actual) => actual == expected,
        Err(e) => {
            tracing::warn!("校验和计算失败: {}", e);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_sha256_known_value() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("hello.txt");
        std::fs::write(&path, b"hello").unwrap();

        let digest = sha256_file(&path).await.unwrap();
        assert_eq!(
            digest,
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
    }

    #[tokio::test]
    async fn test_sha256_spans_block_boundary() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("big.bin");
        // 跨越多个读取块的文件
        let data = vec![0xABu8; READ_BLOCK_SIZE * 3 + 17];
        std::fs::write(&path, &data).unwrap();

        let digest = sha256_file(&path).await.unwrap();

        use sha2::{Digest, Sha256};
        let mut hasher = Sha256::new();
        hasher.update(&data);
        assert_eq!(digest, format!("{:x}", hasher.finalize()));
    }

    #[tokio::test]
    async fn test_verify_mismatch_returns_false() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("hello.txt");
        std::fs::write(&path, b"hello").unwrap();

        assert!(!verify_file(&path, "deadbeef").await);
    }

    #[tokio::test]
    async fn test_verify_missing_file_returns_false() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("missing.bin");

        assert!(!verify_file(&path, "deadbeef").await);
    }
}

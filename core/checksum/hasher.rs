use super::ChecksumType;
use digest::Digest;

/// A streaming hasher over one of the supported [ChecksumType]s.
#[derive(Clone)]
pub enum ChecksumHasher {
    Md5(md5::Md5),
    Sha1(sha1::Sha1),
    Sha256(sha2::Sha256),
    Sha512(sha2::Sha512),
}

impl std::fmt::Debug for ChecksumHasher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("ChecksumHasher").field(&self.kind()).finish()
    }
}

impl ChecksumHasher {
    pub fn new(kind: ChecksumType) -> Self {
        match kind {
            ChecksumType::Md5 => ChecksumHasher::Md5(md5::Md5::new()),
            ChecksumType::Sha1 => ChecksumHasher::Sha1(sha1::Sha1::new()),
            ChecksumType::Sha256 => ChecksumHasher::Sha256(sha2::Sha256::new()),
            ChecksumType::Sha512 => ChecksumHasher::Sha512(sha2::Sha512::new()),
        }
    }

    pub fn kind(&self) -> ChecksumType {
        match self {
            ChecksumHasher::Md5(_) => ChecksumType::Md5,
            ChecksumHasher::Sha1(_) => ChecksumType::Sha1,
            ChecksumHasher::Sha256(_) => ChecksumType::Sha256,
            ChecksumHasher::Sha512(_) => ChecksumType::Sha512,
        }
    }

    pub fn update(&mut self, data: &[u8]) {
        match self {
            ChecksumHasher::Md5(h) => h.update(data),
            ChecksumHasher::Sha1(h) => h.update(data),
            ChecksumHasher::Sha256(h) => h.update(data),
            ChecksumHasher::Sha512(h) => h.update(data),
        }
    }

    pub fn finalize(self) -> Vec<u8> {
        match self {
            ChecksumHasher::Md5(h) => h.finalize().to_vec(),
            ChecksumHasher::Sha1(h) => h.finalize().to_vec(),
            ChecksumHasher::Sha256(h) => h.finalize().to_vec(),
            ChecksumHasher::Sha512(h) => h.finalize().to_vec(),
        }
    }
}

//! Security-information resolution
//!
//! [`SecurityResolver`] turns a path into `(owner, acl)` or a classified
//! [`EntryErrorKind`]. The DACL is always fetched when an entry is emitted;
//! owner extraction is optional and has two paths:
//!
//! - *Native*: `GetFileSecurityW` with `OWNER_SECURITY_INFORMATION`, owner
//!   SID pulled from the descriptor. On failure the managed path is tried
//!   once.
//! - *Managed*: `GetNamedSecurityInfoW`, the high-level access-control API.
//!
//! SID-to-name translation goes through a process-wide [`SidCache`] keyed by
//! the *string form* of the SID. Raw SID pointers are transient descriptor
//! offsets and must never be used as keys. A failed lookup memoizes the
//! string SID itself so retries are O(1), and when even canonicalization
//! fails the identity degrades to a fixed sentinel; no ACE is ever dropped
//! for an untranslatable identity.
//!
//! All OS-allocated buffers (descriptor from `GetNamedSecurityInfoW`, string
//! SID from `ConvertSidToStringSidW`) are released via `LocalFree` on every
//! path, including errors. The `GetFileSecurityW` descriptor lives in a
//! caller-owned `Vec<u8>` scoped to the call.

use crate::entry::AclMap;
use crate::error::EntryErrorKind;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, LazyLock};

/// Process-wide SID cache, shared by every walk in the process
static SHARED_CACHE: LazyLock<Arc<SidCache>> = LazyLock::new(|| Arc::new(SidCache::new()));

/// Thread-safe SID-string → account-name cache
///
/// Entries are add-only for the lifetime of the cache; there is no
/// eviction. Duplicate insertion races are harmless because both writers
/// compute the same value for a given key.
#[derive(Debug, Default)]
pub struct SidCache {
    map: DashMap<String, String>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl SidCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide cache instance
    pub fn shared() -> Arc<SidCache> {
        Arc::clone(&SHARED_CACHE)
    }

    /// Resolve `sid_key` through the cache, invoking `lookup` only on a miss
    ///
    /// A lookup returning `None` memoizes the string SID itself as the
    /// display name, so the identity survives and later misses are free.
    pub fn resolve_with(&self, sid_key: &str, lookup: impl FnOnce() -> Option<String>) -> String {
        if let Some(cached) = self.map.get(sid_key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return cached.clone();
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        let name = lookup().unwrap_or_else(|| sid_key.to_string());
        self.map.insert(sid_key.to_string(), name.clone());
        name
    }

    /// Number of cached translations
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Check if the cache is empty
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Cache hits recorded so far
    pub fn hit_count(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    /// Cache misses recorded so far
    pub fn miss_count(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }
}

/// Resolved security payload for one entry
#[derive(Debug, Clone, Default)]
pub struct SecurityInfo {
    /// Owner principal display name, empty when not resolved
    pub owner: String,

    /// Identity → access-mask map extracted from the DACL
    pub acl: AclMap,
}

/// Per-walk resolution policy, read-only for the walk's duration
#[derive(Debug, Clone, Copy)]
pub struct SecurityPolicy {
    /// Include ACEs inherited from ancestors
    pub include_inherited: bool,

    /// Attempt owner extraction at all
    pub resolve_owner: bool,

    /// Prefer the native descriptor query for the owner
    pub use_native_owner: bool,
}

impl Default for SecurityPolicy {
    fn default() -> Self {
        Self {
            include_inherited: true,
            resolve_owner: true,
            use_native_owner: true,
        }
    }
}

/// Resolves owner and DACL information for filesystem entries
pub struct SecurityResolver {
    cache: Arc<SidCache>,
}

impl SecurityResolver {
    /// Create a resolver backed by the given SID cache
    pub fn new(cache: Arc<SidCache>) -> Self {
        Self { cache }
    }

    /// The cache this resolver translates through
    pub fn cache(&self) -> &SidCache {
        &self.cache
    }
}

#[cfg(windows)]
mod native {
    use super::*;
    use crate::win32::find::to_wide;
    use core::ffi::c_void;
    use std::cell::RefCell;
    use std::path::Path;
    use std::ptr;
    use windows_sys::Win32::Foundation::{
        GetLastError, LocalFree, BOOL, ERROR_INSUFFICIENT_BUFFER, ERROR_SUCCESS,
    };
    use windows_sys::Win32::Security::Authorization::{
        ConvertSidToStringSidW, GetNamedSecurityInfoW, SE_FILE_OBJECT,
    };
    use windows_sys::Win32::Security::{
        GetAce, GetSecurityDescriptorDacl, GetSecurityDescriptorOwner, LookupAccountSidW,
        ACCESS_ALLOWED_ACE, ACE_HEADER, ACL, DACL_SECURITY_INFORMATION,
        OWNER_SECURITY_INFORMATION, PSECURITY_DESCRIPTOR, PSID, SID_NAME_USE,
    };
    use windows_sys::Win32::Storage::FileSystem::GetFileSecurityW;

    // ACE header constants; allowed and denied ACE bodies share one layout.
    const ACE_TYPE_ACCESS_ALLOWED: u8 = 0;
    const ACE_TYPE_ACCESS_DENIED: u8 = 1;
    const ACE_FLAG_INHERITED: u8 = 0x10;

    /// Identity reported when a SID cannot even be canonicalized to its
    /// string form; the ACE is kept rather than dropped
    const UNRESOLVED_SID: &str = "<unresolvable-sid>";

    /// Frees an OS-allocated LocalAlloc buffer when the scope exits
    struct LocalGuard(*mut c_void);

    impl Drop for LocalGuard {
        fn drop(&mut self) {
            if !self.0.is_null() {
                unsafe {
                    LocalFree(self.0);
                }
            }
        }
    }

    fn utf16_until_nul(buf: &[u16]) -> String {
        let len = buf.iter().position(|&c| c == 0).unwrap_or(buf.len());
        String::from_utf16_lossy(&buf[..len])
    }

    /// Fetch the requested security information into a caller-owned buffer
    ///
    /// Size probe first, then the real call. The returned `Vec` owns the
    /// descriptor for the caller's scope.
    fn query_descriptor(wide: &[u16], info: u32) -> Result<Vec<u8>, EntryErrorKind> {
        let mut needed: u32 = 0;
        let ok = unsafe { GetFileSecurityW(wide.as_ptr(), info, ptr::null_mut(), 0, &mut needed) };
        if ok == 0 {
            let code = unsafe { GetLastError() };
            if code != ERROR_INSUFFICIENT_BUFFER {
                return Err(EntryErrorKind::from_os_error(code));
            }
        }
        if needed == 0 {
            return Err(EntryErrorKind::SecurityError);
        }

        let mut buf = vec![0u8; needed as usize];
        let ok = unsafe {
            GetFileSecurityW(
                wide.as_ptr(),
                info,
                buf.as_mut_ptr() as PSECURITY_DESCRIPTOR,
                needed,
                &mut needed,
            )
        };
        if ok == 0 {
            return Err(EntryErrorKind::from_os_error(unsafe { GetLastError() }));
        }
        Ok(buf)
    }

    /// Canonicalize a SID to its string form (`S-1-5-...`)
    fn sid_to_string(sid: PSID) -> Option<String> {
        let mut raw: *mut u16 = ptr::null_mut();
        if unsafe { ConvertSidToStringSidW(sid, &mut raw) } == 0 || raw.is_null() {
            return None;
        }
        let _guard = LocalGuard(raw as *mut c_void);

        let mut len = 0usize;
        while unsafe { *raw.add(len) } != 0 {
            len += 1;
        }
        Some(String::from_utf16_lossy(unsafe {
            std::slice::from_raw_parts(raw, len)
        }))
    }

    /// Translate a SID to `DOMAIN\NAME` (or bare name) via LookupAccountSidW
    ///
    /// Two calls: size probe, then resolve, with thread-local scratch
    /// buffers reused across entries.
    fn lookup_account_name(sid: PSID) -> Option<String> {
        thread_local! {
            static NAME_BUF: RefCell<Vec<u16>> = RefCell::new(Vec::new());
            static DOMAIN_BUF: RefCell<Vec<u16>> = RefCell::new(Vec::new());
        }

        let mut name_len: u32 = 0;
        let mut domain_len: u32 = 0;
        let mut use_kind: SID_NAME_USE = 0;
        unsafe {
            LookupAccountSidW(
                ptr::null(),
                sid,
                ptr::null_mut(),
                &mut name_len,
                ptr::null_mut(),
                &mut domain_len,
                &mut use_kind,
            );
        }
        if name_len == 0 {
            return None;
        }

        NAME_BUF.with(|name_cell| {
            DOMAIN_BUF.with(|domain_cell| {
                let mut name = name_cell.borrow_mut();
                let mut domain = domain_cell.borrow_mut();
                name.resize(name_len as usize, 0);
                domain.resize(domain_len.max(1) as usize, 0);

                let ok = unsafe {
                    LookupAccountSidW(
                        ptr::null(),
                        sid,
                        name.as_mut_ptr(),
                        &mut name_len,
                        domain.as_mut_ptr(),
                        &mut domain_len,
                        &mut use_kind,
                    )
                };
                if ok == 0 {
                    return None;
                }

                let account = utf16_until_nul(&name);
                let domain_name = utf16_until_nul(&domain);
                Some(if domain_name.is_empty() {
                    account
                } else {
                    format!("{}\\{}", domain_name, account)
                })
            })
        })
    }

    impl SecurityResolver {
        /// Resolve owner and DACL for `path` under the given policy
        ///
        /// ACL extraction always runs. A native failure that classifies as a
        /// security-call failure gets one managed retry; anything else is
        /// returned as-is for the caller to record on the entry.
        pub fn resolve(
            &self,
            path: &Path,
            policy: SecurityPolicy,
        ) -> Result<SecurityInfo, EntryErrorKind> {
            let wide = to_wide(path.as_os_str());

            match self.native_query(&wide, policy) {
                Ok(info) => Ok(info),
                Err(kind) if kind.warrants_fallback() => self
                    .managed_query(&wide, policy)
                    .map_err(|_| EntryErrorKind::SecurityError),
                Err(kind) => Err(kind),
            }
        }

        fn native_query(
            &self,
            wide: &[u16],
            policy: SecurityPolicy,
        ) -> Result<SecurityInfo, EntryErrorKind> {
            let acl = self.native_acl(wide, policy.include_inherited)?;

            let owner = if policy.resolve_owner {
                if policy.use_native_owner {
                    match self.native_owner(wide) {
                        Ok(name) => name,
                        // One-shot fallback to the high-level API; a second
                        // failure leaves the owner empty rather than failing
                        // the entry.
                        Err(_) => self.managed_owner(wide).unwrap_or_default(),
                    }
                } else {
                    self.managed_owner(wide).unwrap_or_default()
                }
            } else {
                String::new()
            };

            Ok(SecurityInfo { owner, acl })
        }

        fn native_acl(
            &self,
            wide: &[u16],
            include_inherited: bool,
        ) -> Result<AclMap, EntryErrorKind> {
            let descriptor = query_descriptor(wide, DACL_SECURITY_INFORMATION)?;
            let sd = descriptor.as_ptr() as PSECURITY_DESCRIPTOR;

            let mut present: BOOL = 0;
            let mut dacl: *mut ACL = ptr::null_mut();
            let mut defaulted: BOOL = 0;
            let ok =
                unsafe { GetSecurityDescriptorDacl(sd, &mut present, &mut dacl, &mut defaulted) };
            if ok == 0 {
                return Err(EntryErrorKind::SecurityError);
            }
            if present == 0 {
                // NULL DACL: unrestricted object, reported as an empty map
                return Ok(AclMap::new());
            }

            Ok(unsafe { self.collect_aces(dacl, include_inherited) })
        }

        fn native_owner(&self, wide: &[u16]) -> Result<String, EntryErrorKind> {
            let descriptor = query_descriptor(wide, OWNER_SECURITY_INFORMATION)?;
            let sd = descriptor.as_ptr() as PSECURITY_DESCRIPTOR;

            let mut sid: PSID = ptr::null_mut();
            let mut defaulted: BOOL = 0;
            let ok = unsafe { GetSecurityDescriptorOwner(sd, &mut sid, &mut defaulted) };
            if ok == 0 || sid.is_null() {
                return Err(EntryErrorKind::SecurityError);
            }

            Ok(self.translate_sid(sid))
        }

        /// High-level query used as the fallback for a failed native call
        fn managed_query(
            &self,
            wide: &[u16],
            policy: SecurityPolicy,
        ) -> Result<SecurityInfo, EntryErrorKind> {
            let mut owner_sid: PSID = ptr::null_mut();
            let mut dacl: *mut ACL = ptr::null_mut();
            let mut sd: PSECURITY_DESCRIPTOR = ptr::null_mut();

            let mut info = DACL_SECURITY_INFORMATION;
            if policy.resolve_owner {
                info |= OWNER_SECURITY_INFORMATION;
            }

            let status = unsafe {
                GetNamedSecurityInfoW(
                    wide.as_ptr(),
                    SE_FILE_OBJECT,
                    info,
                    if policy.resolve_owner {
                        &mut owner_sid
                    } else {
                        ptr::null_mut()
                    },
                    ptr::null_mut(),
                    &mut dacl,
                    ptr::null_mut(),
                    &mut sd,
                )
            };
            if status != ERROR_SUCCESS {
                return Err(EntryErrorKind::from_os_error(status));
            }
            let _guard = LocalGuard(sd);

            let acl = unsafe { self.collect_aces(dacl, policy.include_inherited) };
            let owner = if policy.resolve_owner && !owner_sid.is_null() {
                self.translate_sid(owner_sid)
            } else {
                String::new()
            };

            Ok(SecurityInfo { owner, acl })
        }

        /// Owner-only high-level query
        fn managed_owner(&self, wide: &[u16]) -> Option<String> {
            let mut sid: PSID = ptr::null_mut();
            let mut sd: PSECURITY_DESCRIPTOR = ptr::null_mut();

            let status = unsafe {
                GetNamedSecurityInfoW(
                    wide.as_ptr(),
                    SE_FILE_OBJECT,
                    OWNER_SECURITY_INFORMATION,
                    &mut sid,
                    ptr::null_mut(),
                    ptr::null_mut(),
                    ptr::null_mut(),
                    &mut sd,
                )
            };
            if status != ERROR_SUCCESS {
                return None;
            }
            let _guard = LocalGuard(sd);

            if sid.is_null() {
                return None;
            }
            Some(self.translate_sid(sid))
        }

        /// Walk the ACL, coalescing ACEs by identity (last writer wins)
        ///
        /// Safety: `dacl` must point to a valid ACL within a live descriptor
        /// for the duration of the call, or be null.
        unsafe fn collect_aces(&self, dacl: *const ACL, include_inherited: bool) -> AclMap {
            let mut map = AclMap::new();
            if dacl.is_null() {
                return map;
            }

            let count = (*dacl).AceCount;
            for index in 0..count {
                let mut ace: *mut c_void = ptr::null_mut();
                if GetAce(dacl, index as u32, &mut ace) == 0 || ace.is_null() {
                    continue;
                }

                let header = &*(ace as *const ACE_HEADER);
                if !include_inherited && header.AceFlags & ACE_FLAG_INHERITED != 0 {
                    continue;
                }
                if header.AceType != ACE_TYPE_ACCESS_ALLOWED
                    && header.AceType != ACE_TYPE_ACCESS_DENIED
                {
                    continue;
                }

                // Allowed and denied ACEs have the same mask + SidStart body
                let body = &*(ace as *const ACCESS_ALLOWED_ACE);
                let sid = &body.SidStart as *const u32 as PSID;
                map.insert(self.translate_sid(sid), body.Mask);
            }

            map
        }

        /// Translate a SID through the cache, keyed by its string form
        ///
        /// Infallible: a failed account lookup falls back to the string SID,
        /// and a failed canonicalization falls back to a fixed sentinel, so
        /// callers never discard the identity.
        fn translate_sid(&self, sid: PSID) -> String {
            match sid_to_string(sid) {
                Some(key) => self.cache.resolve_with(&key, || lookup_account_name(sid)),
                None => UNRESOLVED_SID.to_string(),
            }
        }
    }
}

#[cfg(not(windows))]
impl SecurityResolver {
    /// Portable stub: non-Windows targets carry no DACL source, so reachable
    /// paths resolve to empty security data and vanished ones classify the
    /// way the native path would.
    pub fn resolve(
        &self,
        path: &std::path::Path,
        _policy: SecurityPolicy,
    ) -> Result<SecurityInfo, EntryErrorKind> {
        match std::fs::symlink_metadata(path) {
            Ok(_) => Ok(SecurityInfo::default()),
            Err(err) => Err(EntryErrorKind::from_io_error(&err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_miss_then_hit() {
        let cache = SidCache::new();

        let first = cache.resolve_with("S-1-5-21-1-2-3-1001", || Some("DOMAIN\\alice".into()));
        assert_eq!(first, "DOMAIN\\alice");
        assert_eq!(cache.miss_count(), 1);

        // Second resolution must not invoke the lookup again
        let second = cache.resolve_with("S-1-5-21-1-2-3-1001", || {
            panic!("lookup invoked on a cache hit")
        });
        assert_eq!(second, first);
        assert_eq!(cache.hit_count(), 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_failed_lookup_memoizes_string_sid() {
        let cache = SidCache::new();

        let name = cache.resolve_with("S-1-5-21-9-9-9-500", || None);
        assert_eq!(name, "S-1-5-21-9-9-9-500");

        // The failure is memoized: the retry is a hit, not a second lookup
        let again = cache.resolve_with("S-1-5-21-9-9-9-500", || {
            panic!("failed lookup was not memoized")
        });
        assert_eq!(again, "S-1-5-21-9-9-9-500");
        assert_eq!(cache.hit_count(), 1);
    }

    #[test]
    fn test_same_sid_resolves_identically() {
        let cache = SidCache::new();
        let a = cache.resolve_with("S-1-1-0", || Some("Everyone".into()));
        let b = cache.resolve_with("S-1-1-0", || Some("SomethingElse".into()));
        assert_eq!(a, b);
    }

    #[test]
    fn test_shared_cache_is_one_instance() {
        let a = SidCache::shared();
        let b = SidCache::shared();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_policy_defaults() {
        let policy = SecurityPolicy::default();
        assert!(policy.include_inherited);
        assert!(policy.resolve_owner);
        assert!(policy.use_native_owner);
    }

    #[cfg(not(windows))]
    #[test]
    fn test_stub_resolver_classifies_missing_path() {
        let resolver = SecurityResolver::new(Arc::new(SidCache::new()));
        let err = resolver
            .resolve(
                std::path::Path::new("no/such/path/anywhere"),
                SecurityPolicy::default(),
            )
            .unwrap_err();
        assert_eq!(err, EntryErrorKind::NotFound);
    }
}

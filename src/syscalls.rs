//! Fixed ordered syscall name table.
//!
//! Renders `syscall:<name>` from the numeric `payload.n` field of a
//! `syscall_enter` event. The ordering is normative and must match the
//! upstream Phoenix-RTOS table byte-for-byte.

use crate::domain::ConverterError;

pub const SYSCALLS: [&str; 102] = [
    "debug",
    "sys_mmap",
    "sys_munmap",
    "sys_fork",
    "vforksvc",
    "exec",
    "spawnSyspage",
    "sys_exit",
    "sys_waitpid",
    "threadJoin",
    "getpid",
    "getppid",
    "gettid",
    "beginthreadex",
    "endthread",
    "nsleep",
    "phMutexCreate",
    "phMutexLock",
    "mutexTry",
    "mutexUnlock",
    "phCondCreate",
    "phCondWait",
    "condSignal",
    "condBroadcast",
    "resourceDestroy",
    "interrupt",
    "portCreate",
    "portDestroy",
    "portRegister",
    "msgSend",
    "msgRecv",
    "msgRespond",
    "lookup",
    "gettime",
    "settime",
    "keepidle",
    "platformctl",
    "wdgreload",
    "threadsinfo",
    "meminfo",
    "sys_perf_start",
    "sys_perf_read",
    "sys_perf_finish",
    "sys_perf_stop",
    "syspageprog",
    "va2pa",
    "signalHandle",
    "signalPost",
    "signalMask",
    "signalSuspend",
    "priority",
    "sys_read",
    "sys_write",
    "sys_open",
    "sys_close",
    "sys_link",
    "sys_unlink",
    "sys_fcntl",
    "sys_ftruncate",
    "sys_lseek",
    "sys_dup",
    "sys_dup2",
    "sys_pipe",
    "sys_mkfifo",
    "sys_chmod",
    "sys_fstat",
    "sys_fsync",
    "sys_accept",
    "sys_accept4",
    "sys_bind",
    "sys_connect",
    "sys_gethostname",
    "sys_getpeername",
    "sys_getsockname",
    "sys_getsockopt",
    "sys_listen",
    "sys_recvfrom",
    "sys_sendto",
    "sys_recvmsg",
    "sys_sendmsg",
    "sys_socket",
    "sys_socketpair",
    "sys_shutdown",
    "sys_sethostname",
    "sys_setsockopt",
    "sys_ioctl",
    "sys_futimens",
    "sys_poll",
    "sys_tkill",
    "sys_setpgid",
    "sys_getpgid",
    "sys_setpgrp",
    "sys_getpgrp",
    "sys_setsid",
    "sys_spawn",
    "release",
    "sbi_putchar",
    "sbi_getchar",
    "sigreturn",
    "sys_mprotect",
    "sys_statvfs",
    "sys_uname",
];

/// Resolve a syscall number to its name, or a fatal error if out of range.
pub fn syscall_name(n: i64) -> Result<&'static str, ConverterError> {
    usize::try_from(n)
        .ok()
        .and_then(|idx| SYSCALLS.get(idx).copied())
        .ok_or(ConverterError::SyscallIndexOutOfRange(n, SYSCALLS.len()))
}

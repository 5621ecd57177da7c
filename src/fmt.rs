//! Logging shim.
//!
//! Each macro forwards to `log` or `defmt`, whichever feature is enabled.
//! With neither, the arguments are still borrowed so that values computed
//! only for logging do not trigger unused warnings.

#![macro_use]
#![allow(unused_macros)]

// `$d` carries a literal `$` into the generated macro definitions.
macro_rules! logging_macro {
    ($d:tt $name:ident) => {
        macro_rules! $name {
            ($d s:literal $d(, $d x:expr)* $d(,)?) => {
                {
                    cfg_if::cfg_if! {
                        if #[cfg(feature = "log")] {
                            ::log::$name!($d s $d(, $d x)*);
                        } else if #[cfg(feature = "defmt")] {
                            ::defmt::$name!($d s $d(, $d x)*);
                        } else {
                            let _ = ($d( & $d x ),*);
                        }
                    }
                }
            };
        }
    };
}

logging_macro!($ trace);
logging_macro!($ debug);
logging_macro!($ info);
logging_macro!($ warn);
logging_macro!($ error);

//! Operator boilerplate for single-field newtypes.

#[macro_export]
macro_rules! op {
    (binary $t:ty, $op:ident, $fn:ident) => {
        impl std::ops::$op for $t {
            type Output = Self;

            fn $fn(self, rhs: Self) -> Self::Output {
                Self(std::ops::$op::$fn(self.0, rhs.0))
            }
        }
    };
    (inplace $t:ty, $op:ident, $fn:ident) => {
        impl std::ops::$op for $t {
            fn $fn(&mut self, rhs: Self) {
                std::ops::$op::$fn(&mut self.0, rhs.0)
            }
        }
    };
    (unary $t:ty, $op:ident, $fn:ident) => {
        impl std::ops::$op for $t {
            type Output = Self;

            fn $fn(self) -> Self::Output {
                Self(std::ops::$op::$fn(self.0))
            }
        }
    };
}

pub use op;

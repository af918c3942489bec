//! Operator boilerplate for single-field fixed-point newtypes.
//!
//! The macros must be invoked in the module that defines the type, since they construct it through its tuple field.

#[macro_export]
macro_rules! op {
    (binary $name:ty, $impl:ident, $method:ident) => {
        impl std::ops::$impl for $name {
            type Output = Self;

            fn $method(self, rhs: Self) -> Self::Output {
                Self(std::ops::$impl::$method(self.0, rhs.0))
            }
        }
    };
    (inplace $name:ty, $impl:ident, $method:ident) => {
        impl std::ops::$impl for $name {
            fn $method(&mut self, rhs: Self) {
                std::ops::$impl::$method(&mut self.0, rhs.0)
            }
        }
    };
    (unary $name:ty, $impl:ident, $method:ident) => {
        impl std::ops::$impl for $name {
            type Output = Self;

            fn $method(self) -> Self::Output {
                Self(std::ops::$impl::$method(self.0))
            }
        }
    };
}

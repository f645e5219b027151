use crate::lexer::tokens::JosaKind;

/// A source position carried by every AST node. Invalid when `line` is 0.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Location {
   pub line: usize,
   pub column: usize,
}

impl Location {
   pub fn new(line: usize, column: usize) -> Location {
      Location { line, column }
   }

   pub fn is_valid(&self) -> bool {
      self.line >= 1
   }
}

/// The root of a parsed program: a flat list of statements.
pub struct Module {
   pub body: Vec<Stmt>,
}

/// Declared type annotations, from the type keywords.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TypeAnnotation {
   Int,     // 정수
   Float,   // 실수
   Char,    // 문자
   Str,     // 문자열
   Bool,    // 논리
   Array,   // 배열
}

/// Statement nodes. Each parent exclusively owns its children.
pub enum Stmt {
   VarDecl(VarDeclStmt),
   Assignment(AssignmentStmt),
   ExprStmt(ExprStmt),
   Return(ReturnStmt),
   If(IfStmt),
   While(WhileStmt),
   RangeFor(RangeForStmt),
   RepeatFor(RepeatForStmt),
   Block(BlockStmt),
   Import(ImportStmt),
   Try(TryStmt),
   Throw(ThrowStmt),
   FuncDecl(FuncDeclStmt),
   Class(ClassDeclStmt),
}

impl Stmt {
   pub fn location(&self) -> Location {
      match self {
         Stmt::VarDecl(s) => s.location,
         Stmt::Assignment(s) => s.location,
         Stmt::ExprStmt(s) => s.location,
         Stmt::Return(s) => s.location,
         Stmt::If(s) => s.location,
         Stmt::While(s) => s.location,
         Stmt::RangeFor(s) => s.location,
         Stmt::RepeatFor(s) => s.location,
         Stmt::Block(s) => s.location,
         Stmt::Import(s) => s.location,
         Stmt::Try(s) => s.location,
         Stmt::Throw(s) => s.location,
         Stmt::FuncDecl(s) => s.location,
         Stmt::Class(s) => s.location,
      }
   }
}

pub struct VarDeclStmt {
   pub annotation: Option<TypeAnnotation>,
   pub name: String,
   pub value: Expr,
   pub location: Location,
}

/// Assignment targets: a variable, an index slot, or an object field.
pub enum AssignTarget {
   Variable(String),
   Index { target: Expr, index: Expr },
   Member { target: Expr, field: String },
}

pub struct AssignmentStmt {
   pub target: AssignTarget,
   pub value: Expr,
   pub location: Location,
}

pub struct ExprStmt {
   pub expr: Expr,
   pub location: Location,
}

pub struct ReturnStmt {
   pub value: Option<Expr>,
   pub location: Location,
}

pub struct IfStmt {
   pub condition: Expr,
   pub then_branch: Box<Stmt>,
   pub else_branch: Option<Box<Stmt>>,
   pub location: Location,
}

pub struct WhileStmt {
   pub condition: Expr,
   pub body: Box<Stmt>,
   pub location: Location,
}

/// The inclusive/exclusive flavor of a range-for upper bound.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RangeBound {
   UpToInclusive, // 까지
   LessThan,      // 미만
   AtMost,        // 이하
   GreaterThan,   // 초과
   AtLeast,       // 이상
}

/// `i가 1부터 10까지 반복 { … }`: an integer induction variable with a
/// fixed step of one.
pub struct RangeForStmt {
   pub variable: String,
   pub start: Expr,
   pub end: Expr,
   pub bound: RangeBound,
   pub body: Box<Stmt>,
   pub location: Location,
}

/// `5번 반복 { … }`: run the body a fixed number of times.
pub struct RepeatForStmt {
   pub count: Expr,
   pub body: Box<Stmt>,
   pub location: Location,
}

pub struct BlockStmt {
   pub body: Vec<Stmt>,
   pub location: Location,
}

pub struct ImportStmt {
   pub path: String,
   pub location: Location,
}

pub struct TryStmt {
   pub body: Box<Stmt>,
   pub error_name: String,
   pub catch_body: Box<Stmt>,
   pub location: Location,
}

pub struct ThrowStmt {
   pub value: Expr,
   pub location: Location,
}

pub struct FuncDeclStmt {
   pub name: String,
   pub func: FuncLit,
   pub location: Location,
}

pub struct ClassDeclStmt {
   pub name: String,
   pub fields: Vec<FieldDecl>,
   pub constructor: Option<FuncLit>,
   pub methods: Vec<(String, FuncLit)>,
   pub location: Location,
}

pub struct FieldDecl {
   pub annotation: Option<TypeAnnotation>,
   pub name: String,
   pub location: Location,
}

/// Expression nodes.
pub enum Expr {
   Identifier(IdentExpr),
   IntLit(IntLitExpr),
   FloatLit(FloatLitExpr),
   StrLit(StrLitExpr),
   BoolLit(BoolLitExpr),
   ArrayLit(ArrayLitExpr),
   DictLit(DictLitExpr),
   Binary(BinaryExpr),
   Unary(UnaryExpr),
   Call(CallExpr),
   Index(IndexExpr),
   FuncLitExpr(Box<FuncLit>),
   Range(RangeExpr),
   JosaCall(JosaCallExpr),
   Match(MatchExpr),
   Member(MemberExpr),
   This(ThisExpr),
}

impl Expr {
   pub fn location(&self) -> Location {
      match self {
         Expr::Identifier(e) => e.location,
         Expr::IntLit(e) => e.location,
         Expr::FloatLit(e) => e.location,
         Expr::StrLit(e) => e.location,
         Expr::BoolLit(e) => e.location,
         Expr::ArrayLit(e) => e.location,
         Expr::DictLit(e) => e.location,
         Expr::Binary(e) => e.location,
         Expr::Unary(e) => e.location,
         Expr::Call(e) => e.location,
         Expr::Index(e) => e.location,
         Expr::FuncLitExpr(e) => e.location,
         Expr::Range(e) => e.location,
         Expr::JosaCall(e) => e.location,
         Expr::Match(e) => e.location,
         Expr::Member(e) => e.location,
         Expr::This(e) => e.location,
      }
   }

   /// Postpositions attach only to these expression shapes.
   pub fn accepts_josa(&self) -> bool {
      matches!(
         self,
         Expr::Identifier(_)
            | Expr::IntLit(_)
            | Expr::FloatLit(_)
            | Expr::StrLit(_)
            | Expr::BoolLit(_)
            | Expr::ArrayLit(_)
            | Expr::Call(_)
            | Expr::Index(_)
      )
   }
}

pub struct IdentExpr {
   pub name: String,
   pub location: Location,
}

pub struct IntLitExpr {
   pub value: i64,
   pub location: Location,
}

pub struct FloatLitExpr {
   pub value: f64,
   pub location: Location,
}

pub struct StrLitExpr {
   pub value: String,
   pub location: Location,
}

pub struct BoolLitExpr {
   pub value: bool,
   pub location: Location,
}

pub struct ArrayLitExpr {
   pub elements: Vec<Expr>,
   pub location: Location,
}

pub struct DictLitExpr {
   pub entries: Vec<(String, Expr)>,
   pub location: Location,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinaryOp {
   Add,
   Sub,
   Mul,
   Div,
   Mod,
   Eq,
   NotEq,
   Less,
   Greater,
   LessEq,
   GreaterEq,
   And,
   Or,
}

pub struct BinaryExpr {
   pub left: Box<Expr>,
   pub op: BinaryOp,
   pub right: Box<Expr>,
   /// The operator token's position, used for runtime error lines.
   pub location: Location,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnaryOp {
   Negate, // -x
   Not,    // !x
}

pub struct UnaryExpr {
   pub op: UnaryOp,
   pub operand: Box<Expr>,
   pub location: Location,
}

pub struct CallExpr {
   pub callee: Box<Expr>,
   pub args: Vec<Expr>,
   pub location: Location,
}

pub struct IndexExpr {
   pub target: Box<Expr>,
   pub index: Box<Expr>,
   pub location: Location,
}

pub struct FuncLit {
   pub params: Vec<String>,
   pub body: Vec<Stmt>,
   pub location: Location,
}

/// A standalone range expression (`1부터 10까지`), valid wherever the
/// `RANGE` parse feature is enabled.
pub struct RangeExpr {
   pub start: Box<Expr>,
   pub end: Box<Expr>,
   pub bound: RangeBound,
   pub location: Location,
}

/// `배열을 정렬한다`: a method dispatched through a postposition.
pub struct JosaCallExpr {
   pub target: Box<Expr>,
   pub josa: JosaKind,
   pub method: String,
   pub location: Location,
}

pub enum MatchPattern {
   Literal(Box<Expr>),
   Wildcard,
}

pub struct MatchArm {
   pub pattern: MatchPattern,
   pub result: Expr,
   pub location: Location,
}

/// `값 에 대해 { 1 -> "하나" … _ -> "기타" }` as an expression.
pub struct MatchExpr {
   pub scrutinee: Box<Expr>,
   pub arms: Vec<MatchArm>,
   pub location: Location,
}

pub struct MemberExpr {
   pub target: Box<Expr>,
   pub field: String,
   pub location: Location,
}

pub struct ThisExpr {
   pub location: Location,
}
